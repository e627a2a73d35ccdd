//! Schema Form CLI
//!
//! Command-line driver that composes forms from schema files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use schema_form::{
    definitions_of, error_list, read_document, read_error_schema, read_optional, render,
    to_id_schema, Element, FormDocuments, FormFiles, Node, Registry, ResolveError,
    DEFAULT_ID_PREFIX,
};

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Compose form trees from JSON schemas and UI schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the form tree of a schema
    Render {
        /// Schema file
        schema: PathBuf,

        /// UI schema overlay file
        #[arg(long)]
        ui: Option<PathBuf>,

        /// Form data file
        #[arg(long)]
        data: Option<PathBuf>,

        /// Error tree file (`{"__errors": [..], "<field>": {..}}`)
        #[arg(long)]
        errors: Option<PathBuf>,

        /// Name of the root field
        #[arg(long, default_value = "")]
        name: String,

        /// Identifier of the root node
        #[arg(long, default_value = DEFAULT_ID_PREFIX)]
        id_prefix: String,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Render every field disabled
        #[arg(long)]
        disabled: bool,

        /// Render every field read-only
        #[arg(long)]
        read_only: bool,
    },

    /// Print the identity schema of a schema
    Ids {
        /// Schema file
        schema: PathBuf,

        /// Form data file
        #[arg(long)]
        data: Option<PathBuf>,

        /// Identifier of the root node
        #[arg(long, default_value = DEFAULT_ID_PREFIX)]
        id_prefix: String,
    },

    /// Flatten an error tree into a list
    Errors {
        /// Error tree file
        errors: PathBuf,

        /// Output the list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            schema,
            ui,
            data,
            errors,
            name,
            id_prefix,
            format,
            pretty,
            output,
            disabled,
            read_only,
        } => run_render(RenderArgs {
            schema,
            ui,
            data,
            errors,
            name,
            id_prefix,
            format,
            pretty,
            output,
            disabled,
            read_only,
        }),

        Commands::Ids {
            schema,
            data,
            id_prefix,
        } => run_ids(&schema, data.as_deref(), &id_prefix),

        Commands::Errors { errors, json } => run_errors(&errors, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct RenderArgs {
    schema: PathBuf,
    ui: Option<PathBuf>,
    data: Option<PathBuf>,
    errors: Option<PathBuf>,
    name: String,
    id_prefix: String,
    format: Format,
    pretty: bool,
    output: Option<PathBuf>,
    disabled: bool,
    read_only: bool,
}

fn run_render(args: RenderArgs) -> Result<(), u8> {
    let RenderArgs {
        schema: schema_path,
        ui,
        data,
        errors,
        name,
        id_prefix,
        format,
        pretty,
        output,
        disabled,
        read_only,
    } = args;

    let files = FormFiles::new(schema_path)
        .ui_schema(ui)
        .form_data(data)
        .errors(errors);
    let inputs = FormDocuments::load(&files)
        .and_then(|documents| documents.into_inputs(&id_prefix))
        .map_err(report)?
        .name(name)
        .disabled(disabled)
        .read_only(read_only);

    let field = render(&inputs).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut form = Element::new("form").class("schema-form");
    if !inputs.error_schema.is_empty() {
        form = form.child(error_list(&inputs.error_schema.to_error_list()));
    }
    let form = Node::from(form.child(field));

    let rendered = match format {
        Format::Text => form.to_string(),
        Format::Json => {
            let json = if pretty {
                serde_json::to_string_pretty(&form)
            } else {
                serde_json::to_string(&form)
            };
            json.map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?
        }
    };

    write_output(output.as_deref(), &rendered)
}

fn run_ids(schema_path: &Path, data: Option<&Path>, id_prefix: &str) -> Result<(), u8> {
    let schema = read_document(schema_path).map_err(report)?;
    let form_data = read_optional(data).map_err(report)?;

    let registry = Registry::builder()
        .definitions(definitions_of(&schema))
        .build();
    let id_schema =
        to_id_schema(&schema, id_prefix, &registry.resolver(), &form_data).map_err(report)?;

    let rendered = serde_json::to_string_pretty(&id_schema).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", rendered);
    Ok(())
}

fn run_errors(path: &Path, json_output: bool) -> Result<(), u8> {
    let error_schema = read_error_schema(Some(path)).map_err(report)?;
    let entries = error_schema.to_error_list();

    if json_output {
        let rendered = serde_json::to_string_pretty(&entries).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else if entries.is_empty() {
        println!("No errors");
    } else {
        for entry in &entries {
            println!("{}", entry.stack);
        }
    }
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), u8> {
    match output {
        Some(path) => std::fs::write(path, content).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3u8
        }),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Print an error and map it to its exit code.
fn report(e: ResolveError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}
