use clap::{ArgGroup, Parser, Subcommand};
use drip_core::*;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drip")]
#[command(about = "Infusion rate calculator (µg/kg/min ⇄ mg/h ⇄ ml/h)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one rate into the other two
    #[command(group(ArgGroup::new("rate").required(true).args(["a", "b", "c"])))]
    Convert {
        /// Drug preset supplying dose and volume
        #[arg(long)]
        drug: Option<String>,

        /// Total dose in the bag (mg), overrides the preset
        #[arg(long, allow_hyphen_values = true)]
        dose: Option<String>,

        /// Dilution volume (ml), overrides the preset
        #[arg(long, allow_hyphen_values = true)]
        volume: Option<String>,

        /// Patient weight (kg)
        #[arg(long, allow_hyphen_values = true)]
        weight: Option<String>,

        /// Rate A in µg/kg/min
        #[arg(long, allow_hyphen_values = true)]
        a: Option<String>,

        /// Rate B in mg/h
        #[arg(long, allow_hyphen_values = true)]
        b: Option<String>,

        /// Rate C (pump) in ml/h
        #[arg(long, allow_hyphen_values = true)]
        c: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List drug presets
    Presets {
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive calculator reading commands from stdin (default)
    Session,
}

/// Exit status for a conversion the engine rejected
const EXIT_INVALID_INPUT: i32 = 2;

fn main() -> Result<()> {
    drip_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let presets = default_presets().with_config(&config.presets);
    let errors = presets.validate();
    if !errors.is_empty() {
        eprintln!("Preset validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::PresetValidation("Invalid preset table".into()));
    }
    tracing::debug!("Loaded {} presets", presets.len());

    let mut calc = Calculator::new(presets);
    if let Some(weight) = config.patient.default_weight_kg {
        calc = calc.with_default_weight(weight);
    }

    match cli.command {
        Some(Commands::Convert {
            drug,
            dose,
            volume,
            weight,
            a,
            b,
            c,
            json,
        }) => {
            let inputs = [
                (InputField::Dose, dose),
                (InputField::Volume, volume),
                (InputField::Weight, weight),
            ];
            let rate = [(RateField::A, a), (RateField::B, b), (RateField::C, c)]
                .into_iter()
                .find_map(|(field, value)| value.map(|v| (field, v)));
            cmd_convert(calc, drug, inputs, rate, json)
        }
        Some(Commands::Presets { json }) => cmd_presets(calc.presets(), json),
        Some(Commands::Session) | None => cmd_session(calc),
    }
}

#[derive(Serialize)]
struct ConvertOutput<'a> {
    drug: Option<&'a str>,
    params: InfusionParameters,
    concentration_mg_per_ml: f64,
    #[serde(flatten)]
    rendered: &'a Rendered,
}

fn cmd_convert(
    mut calc: Calculator,
    drug: Option<String>,
    inputs: [(InputField, Option<String>); 3],
    rate: Option<(RateField, String)>,
    json: bool,
) -> Result<()> {
    if let Some(ref name) = drug {
        let canonical = match calc.presets().resolve(name) {
            Some(preset) => preset.name.clone(),
            None => {
                eprintln!("Unknown drug: {}. Run `drip presets` to list them.", name);
                return Err(Error::Config(format!("unknown drug {}", name)));
            }
        };
        calc.on_preset_selected(&canonical);
    }

    for (field, value) in inputs {
        if let Some(raw) = value {
            calc.on_field_changed(field, &raw);
        }
    }

    let rendered = match rate {
        Some((field, raw)) => calc.on_rate_field_committed(field, &raw),
        None => calc.refresh(),
    };

    if let Some(ref message) = rendered.error {
        eprintln!("Error: {}", message);
        std::process::exit(EXIT_INVALID_INPUT);
    }

    if json {
        let params = calc.params();
        let output = ConvertOutput {
            drug: calc.selected_preset().map(|p| p.name.as_str()),
            params,
            concentration_mg_per_ml: params.concentration_mg_per_ml(),
            rendered: &rendered,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        display_params(&calc);
        display_rates(&rendered);
    }

    Ok(())
}

fn cmd_presets(presets: &PresetTable, json: bool) -> Result<()> {
    if json {
        let list: Vec<&DrugPreset> = presets.iter().collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!(
        "{:<14} {:>10} {:>10} {:>12} {:>14}",
        "Drug", "Dose mg", "Volume ml", "mg/ml", "Warn µg/kg/min"
    );
    for p in presets.iter() {
        let threshold = p
            .warning_threshold_ug_kg_min
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<14} {:>10} {:>10} {:>12.4} {:>14}",
            p.name,
            p.dose_mg,
            p.volume_ml,
            p.concentration_mg_per_ml(),
            threshold
        );
    }
    Ok(())
}

fn cmd_session(mut calc: Calculator) -> Result<()> {
    println!("drip: type 'help' for commands, 'quit' to exit");
    display_rates(&calc.refresh());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match parse_command(&line) {
            SessionCommand::Quit => break,
            SessionCommand::Help => print_help(),
            SessionCommand::Presets => cmd_presets(calc.presets(), false)?,
            SessionCommand::Empty => continue,
            SessionCommand::Unknown(text) => {
                println!("Unknown command: {}. Type 'help' for commands.", text);
            }
            SessionCommand::Show => {
                display_params(&calc);
                display_rates(&calc.refresh());
            }
            SessionCommand::Preset(name) => {
                let canonical = calc.presets().resolve(&name).map(|p| p.name.clone());
                let rendered = match canonical {
                    Some(ref canonical) => calc.on_preset_selected(canonical),
                    None => {
                        println!("No preset named {}", name);
                        calc.on_preset_selected(&name)
                    }
                };
                display_params(&calc);
                display_rates(&rendered);
            }
            SessionCommand::Step(field, direction) => {
                let rendered = calc.on_stepper_clicked(field, direction);
                println!("  {} = {}", field, calc.text(field));
                display_rates(&rendered);
            }
            SessionCommand::Set(Field::Input(field), raw) => {
                display_rates(&calc.on_field_changed(field, &raw));
            }
            SessionCommand::Set(Field::Rate(field), raw) => {
                display_rates(&calc.on_rate_field_committed(field, &raw));
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Quit,
    Help,
    Show,
    Presets,
    Empty,
    Preset(String),
    Step(Field, StepDirection),
    Set(Field, String),
    Unknown(String),
}

fn parse_command(line: &str) -> SessionCommand {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_lowercase().as_str() {
        "" => SessionCommand::Empty,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        "help" | "?" => SessionCommand::Help,
        "show" => SessionCommand::Show,
        "presets" => SessionCommand::Presets,
        "preset" | "drug" => SessionCommand::Preset(rest.to_string()),
        "+" | "-" => match Field::from_name(rest) {
            Some(field) => {
                let direction = if head == "+" {
                    StepDirection::Increment
                } else {
                    StepDirection::Decrement
                };
                SessionCommand::Step(field, direction)
            }
            None => SessionCommand::Unknown(line.to_string()),
        },
        _ => match Field::from_name(head) {
            Some(field) => SessionCommand::Set(field, rest.to_string()),
            None => SessionCommand::Unknown(line.to_string()),
        },
    }
}

fn print_help() {
    println!("Commands:");
    println!("  dose <mg>        set total dose");
    println!("  volume <ml>      set dilution volume");
    println!("  weight <kg>      set patient weight");
    println!("  a|b|c <value>    enter a rate (empty clears it)");
    println!("  preset <name>    load a drug preset");
    println!("  + <field>        step a field up by 1");
    println!("  - <field>        step a field down by 1");
    println!("  show             show inputs and rates");
    println!("  presets          list presets");
    println!("  quit             exit");
}

fn display_params(calc: &Calculator) {
    let params = calc.params();
    let drug = calc
        .selected_preset()
        .map(|p| p.name.as_str())
        .unwrap_or("custom");
    println!(
        "  {}: {} mg / {} ml, {} kg",
        drug,
        calc.text(Field::Input(InputField::Dose)),
        calc.text(Field::Input(InputField::Volume)),
        calc.text(Field::Input(InputField::Weight)),
    );
    if params.is_valid() {
        println!("  Concentration: {:.4} mg/ml", params.concentration_mg_per_ml());
    }
}

fn display_rates(rendered: &Rendered) {
    if let Some(ref message) = rendered.error {
        println!("  Error: {}", message);
        return;
    }

    for field in RateField::ALL {
        let text = rendered.text(field);
        let value = if text.is_empty() { "-" } else { text };
        let flag = if field == RateField::A && rendered.high_dose_warning {
            "  ⚠ HIGH DOSE"
        } else {
            ""
        };
        println!("  {:?} {:>10} {}{}", field, value, field.unit(), flag);
    }
}
