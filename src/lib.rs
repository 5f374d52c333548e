#[cfg(feature = "experimental")]
pub mod api;

pub mod config;

#[cfg(feature = "experimental")]
pub mod db;

pub mod errors;
pub mod query;
pub mod query_ast;

use std::io::Read;

pub use errors::QueryError;
pub use query::{QueryOptions, QuerySource, QueryType, open};
pub use query_ast::{Select, compile};

/// Command-line entrypoint: `catalog-query compile` or `catalog-query run`, input on stdin.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let _ = env_logger::Builder::from_default_env()
        .filter_module("catalog_query", log::LevelFilter::Debug)
        .is_test(false)
        .try_init();

    let command = std::env::args().nth(1).unwrap_or_default();
    match command.as_str() {
        "compile" => {
            let select: Select = serde_json::from_str(&read_stdin()?)?;
            println!("{}", compile(&select)?);
        }
        #[cfg(feature = "experimental")]
        "run" => {
            let mut service = api::QueryService::new(None);
            println!("{}", service.handle_str(&read_stdin()?));
        }
        other => {
            log::error!("unknown command [{}]", other);
            return Err(format!("usage: catalog-query <compile|run> < request.json (got [{}])", other).into());
        }
    }
    Ok(())
}

fn read_stdin() -> std::io::Result<String> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}
