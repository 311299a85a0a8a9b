use std::fs;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use specdoc::fidelity::{restore, FidelityValidator};
use specdoc::markdown::{extract, render};
use specdoc::spec_document::{ApiSpec, SpecFormat};

#[derive(Parser, Debug)]
#[command(name = "specdoc")]
#[command(about = "Convert OpenAPI schema definitions to Markdown field tables and back")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a specification file as a Markdown document
    Convert {
        /// Path to the specification file (YAML or JSON)
        spec_file: String,

        /// Output file; printed to stdout if omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Rebuild a specification from a Markdown document
    Restore {
        /// Path to the Markdown document
        doc_file: String,

        /// Output encoding for the rebuilt specification
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Output file; printed to stdout if omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Score how much of a specification survives a full round trip
    Validate {
        /// Path to the specification file (YAML or JSON)
        spec_file: String,

        /// Exit with an error when the score falls below this threshold
        #[arg(long, default_value_t = 0)]
        min_score: u8,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for SpecFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => SpecFormat::Yaml,
            OutputFormat::Json => SpecFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert { spec_file, output } => {
            let text =
                fs::read_to_string(&spec_file).expect("Failed to read the specification file");
            let spec = match ApiSpec::parse(&text) {
                Ok(spec) => spec,
                Err(e) => {
                    eprintln!("\n❌ Error: {}", e);
                    process::exit(1);
                }
            };
            let document = render(&spec);
            write_output(&document, output.as_deref());
        }

        Command::Restore {
            doc_file,
            format,
            output,
        } => {
            let text = fs::read_to_string(&doc_file).expect("Failed to read the Markdown document");
            let spec = restore(&extract(&text));
            let serialized = match spec.serialize(format.into()) {
                Ok(serialized) => serialized,
                Err(e) => {
                    eprintln!("\n❌ Error: {}", e);
                    process::exit(1);
                }
            };
            write_output(&serialized, output.as_deref());
        }

        Command::Validate {
            spec_file,
            min_score,
        } => {
            let text =
                fs::read_to_string(&spec_file).expect("Failed to read the specification file");
            let result = FidelityValidator::new().validate(&text);

            println!("\n=== Fidelity Report ===");
            println!("  Score: {}/100", result.score);
            if result.report.is_empty() {
                println!("  ✓ No discrepancies found");
            }
            for line in &result.report {
                println!("  ⚠ {}", line);
            }

            if result.score < min_score {
                eprintln!("\n❌ Score is below the required minimum of {}", min_score);
                process::exit(1);
            }
        }
    }
}

fn write_output(content: &str, output: Option<&str>) {
    match output {
        Some(path) => {
            fs::write(path, content).expect("Failed to write the output file");
            println!("\n=== Conversion Complete ===");
            println!("  ✓ Output file: {}", path);
        }
        None => print!("{}", content),
    }
}
