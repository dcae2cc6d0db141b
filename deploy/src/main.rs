//! Меню деплоя Smart Confidant.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use confidant_deploy::{build_image, execute, push_image, MenuChoice, DEFAULT_CHOICE};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "deploy", version, about = "Smart Confidant - Cloud Deployment")]
struct Args {
    /// Пункт меню 1-5 (по умолчанию 5, локальный запуск)
    #[arg(long)]
    choice: Option<String>,
    /// Собрать и запушить образ, затем спросить пункт меню
    #[arg(long)]
    interactive: bool,
}

fn rule() -> String {
    "=".repeat(50)
}

fn prompt_choice() -> anyhow::Result<String> {
    println!("\n{}", rule());
    println!("Image ready. Select deployment target:");
    println!("{}", rule());
    for choice in MenuChoice::ALL {
        println!("  {}. {}", choice.number(), choice.label());
    }
    println!();
    print!("Enter choice [1-5]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn main() -> anyhow::Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    println!("{}", rule());
    println!("Smart Confidant - Cloud Deployment");
    println!("{}", rule());

    let raw = if args.interactive {
        if let Err(e) = build_image() {
            println!("\nBuild failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
        if let Err(e) = push_image() {
            println!("\nPush failed ({}). Make sure you're logged in: docker login", e);
            return Ok(ExitCode::FAILURE);
        }
        prompt_choice()?
    } else {
        let choice = args.choice.unwrap_or_else(|| DEFAULT_CHOICE.to_string());
        println!("\nUsing choice {}", choice.trim());
        choice
    };

    let choice = match MenuChoice::parse(&raw) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Err(e) = execute(choice) {
        println!("  Error: {}", e);
    }

    println!("\n{}", rule());
    println!("Deployment complete!");
    println!("{}", rule());
    Ok(ExitCode::SUCCESS)
}
