use colored::Colorize;
use log::debug;
use std::process::exit;
use toit_tql::context::Context;
use toit_tql::{render, render_preview, suggestions, validate, RenderOptions};

pub mod server;

pub fn translate_one(
    input: String,
    tenant: Option<String>,
    preview: bool,
) -> Result<(), toit_tql::Error> {
    let context = Context::current()?;
    let tenant = tenant.or_else(|| {
        context
            .as_ref()
            .and_then(Context::tenant)
            .map(String::from)
    });
    let options = options_of(context.as_ref());

    if preview {
        println!(
            "{}",
            render_preview(input.as_str(), tenant.as_deref(), &options)?
        );

        return Ok(());
    }

    let query = render(input.as_str(), tenant.as_deref(), &options)?;

    println!("{}", query.sql);
    for (index, param) in query.params.iter().enumerate() {
        println!("{} {param}", format!("-- {}:", index + 1).dimmed());
    }

    Ok(())
}

pub fn validate_one(input: String) -> Result<(), toit_tql::Error> {
    let validation = validate(input.as_str());

    if validation.valid {
        println!("{}", "valid".bold().green());

        return Ok(());
    }

    for error in &validation.errors {
        eprintln!("{intro}: {error}", intro = "invalid".bold().red());
    }
    exit(1);
}

pub fn suggest(input: String, cursor: Option<usize>) -> Result<(), toit_tql::Error> {
    let cursor = cursor.unwrap_or_else(|| input.chars().count());

    for suggestion in suggestions(input.as_str(), cursor) {
        println!("{suggestion}");
    }

    Ok(())
}

/// The options of the current context, or the defaults when there is none.
pub fn options_of(context: Option<&Context>) -> RenderOptions {
    match context {
        Some(context) => {
            debug!("using context {}", context.name);
            context.options.clone()
        }
        None => RenderOptions::default(),
    }
}

pub fn exit_with(error: toit_tql::Error) -> ! {
    eprintln!("{intro}: {error}", intro = "error".bold().red());
    exit(1);
}
