// Rust Data Transformation Engine - Main executable
// Author: Gabriel Demetrios Lafis

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use log::info;

use rust_data_transformation_engine::{
    api::Server,
    data::ContentType,
    frame::ColumnSpec,
    query::{execute_with, OutputShape, ParserKind, Payload, QueryRequest},
    utils::{init_file_logging, init_logging, Config},
};

#[actix_web::main]
async fn main() -> Result<()> {
    let matches = Command::new("Rust Data Transformation Engine")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gabriel Demetrios Lafis")
        .about("Turns JSON, CSV, XML and GraphQL payloads into tables and time series")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            Command::new("server")
                .about("Run the API server")
                .arg(
                    Arg::new("host")
                        .short('H')
                        .long("host")
                        .value_name("HOST")
                        .help("Sets the server host")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Sets the server port")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("query")
                .about("Run one query over a payload file and print the result as JSON")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Payload file")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("type")
                        .short('t')
                        .long("type")
                        .value_name("TYPE")
                        .help("Payload type: json, csv, tsv, xml, html, graphql or yaml")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("parser")
                        .long("parser")
                        .value_name("PARSER")
                        .help("simple, backend, uql or groq")
                        .takes_value(true)
                        .default_value("simple"),
                )
                .arg(
                    Arg::new("query")
                        .short('q')
                        .long("query")
                        .value_name("TEXT")
                        .help("UQL or GROQ query text")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .value_name("SELECTOR")
                        .help("Root selector applied before column extraction")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("column")
                        .long("column")
                        .value_name("SELECTOR:ALIAS:FORMAT")
                        .help("Output column; may be repeated")
                        .takes_value(true)
                        .multiple_occurrences(true),
                )
                .arg(
                    Arg::new("timeseries")
                        .long("timeseries")
                        .help("Produce a time series instead of a table"),
                ),
        )
        .get_matches();

    let config = Config::load(matches.value_of("config").map(Path::new))
        .context("failed to load configuration")?;

    let level = config.log_level_filter();
    match &config.logging.file {
        Some(path) => init_file_logging(level, path)
            .with_context(|| format!("failed to open log file {}", path))?,
        None => init_logging(level).map_err(|e| anyhow!("failed to initialize logger: {}", e))?,
    }

    match matches.subcommand() {
        Some(("server", sub)) => run_server(config, sub).await,
        Some(("query", sub)) => run_query(&config, sub),
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            Ok(())
        }
    }
}

async fn run_server(mut config: Config, matches: &ArgMatches) -> Result<()> {
    if let Some(host) = matches.value_of("host") {
        config.server.host = host.to_string();
    }
    if let Some(port) = matches.value_of("port") {
        config.server.port = port
            .parse()
            .with_context(|| format!("invalid port '{}'", port))?;
    }
    config.validate()?;

    info!("Starting server at {}:{}", config.server.host, config.server.port);
    Server::new(config).run().await?;
    Ok(())
}

fn run_query(config: &Config, matches: &ArgMatches) -> Result<()> {
    let input = matches.value_of("input").unwrap_or_default();
    let raw = fs::read(input).with_context(|| format!("failed to read {}", input))?;

    let content_type = match matches.value_of("type") {
        Some(name) => ContentType::from_name(name).ok_or_else(|| anyhow!("unknown payload type '{}'", name))?,
        None => Path::new(input)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ContentType::from_name)
            .unwrap_or_default(),
    };

    let parser = match matches.value_of("parser").unwrap_or("simple") {
        "simple" => ParserKind::Simple,
        "backend" => ParserKind::Backend,
        "uql" => ParserKind::Uql,
        "groq" => ParserKind::Groq,
        other => return Err(anyhow!("unknown parser '{}'", other)),
    };

    let columns = matches
        .values_of("column")
        .map(|values| {
            values
                .map(|text| ColumnSpec::parse(text).ok_or_else(|| anyhow!("invalid column '{}'", text)))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let query_text = matches.value_of("query").unwrap_or_default();
    let mut request = QueryRequest::new(content_type, parser)
        .with_columns(columns)
        .with_root_selector(matches.value_of("root").unwrap_or_default());
    request = match parser {
        ParserKind::Uql => request.with_uql(query_text),
        ParserKind::Groq => request.with_groq(query_text),
        ParserKind::Simple | ParserKind::Backend => request,
    };
    if matches.is_present("timeseries") {
        request = request.with_output_shape(OutputShape::Timeseries);
    }

    let response = execute_with(&request, Payload::Bytes(raw), &config.engine)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
