mod args;
mod commands;

use crate::args::{Command, ContextParams};
use args::Args;
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use toit_tql::context::{Context, ContextName};
use toit_tql::cache;

fn main() {
    env_logger::init();

    let args = Args::parse();

    let result = match args.command {
        Command::CreateContext(context) => create_context(context),
        Command::UseContext { name } => use_context(name),
        Command::ListContexts => list_contexts(),
        Command::Translate {
            input,
            tenant,
            preview,
        } => commands::translate_one(input, tenant, preview),
        Command::Validate { input } => commands::validate_one(input),
        Command::Suggest { input, cursor } => commands::suggest(input, cursor),
        Command::Server(params) => commands::server::run(params),
    };

    if let Err(error) = result {
        commands::exit_with(error);
    }
}

fn create_context(params: ContextParams) -> Result<(), toit_tql::Error> {
    let use_it = params.use_it;
    let tenant = match params.tenant.clone() {
        Some(tenant) => tenant,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Tenant id")
            .interact_text()?,
    };
    let new_context = params.into_context(tenant);

    validate_new_context(&new_context)?;

    cache::write(&new_context)?;

    println!("Create new context \x1b[1m{}\x1b[0m.", new_context.name);

    if use_it {
        use_context(new_context.name.into())?;
    } else {
        println!(
            "Switch to it by running \x1b[1mtql use-context {}\x1b[0m.",
            new_context.name
        );
    }

    Ok(())
}

fn validate_new_context(context: &Context) -> Result<(), toit_tql::Error> {
    if context.tenant().is_none() {
        Err(toit_tql::MissingTenantError)?;
    }

    Ok(())
}

fn use_context(name: String) -> Result<(), toit_tql::Error> {
    let context_name: ContextName = name.into();

    // Make sure it exists before switching to it.
    let _: Context = cache::read(&context_name)?;
    cache::write(&context_name)?;

    println!("Switched to context \x1b[1m{}\x1b[0m.", context_name);

    Ok(())
}

fn list_contexts() -> Result<(), toit_tql::Error> {
    use colored::Colorize;

    let current_context = Context::current()?.map(|context| context.name);
    let known_contexts: Vec<Context> = cache::read_all()?;

    println!("Available contexts:");
    for context in &known_contexts {
        println!(
            "{}{}: {} ({:?})",
            if current_context.as_ref() == Some(&context.name) {
                " * ".bold()
            } else {
                "   ".into()
            },
            context.name.to_string().bold(),
            context.tenant.as_deref().unwrap_or("no tenant"),
            context.options.dialect,
        )
    }

    Ok(())
}
