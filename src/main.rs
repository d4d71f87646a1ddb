//! Wealthflow CLI Entry Point
//!
//! Command-line front end for fee calculation and workflow operations.
//!
//! # Usage
//!
//! ```bash
//! # Calculate a fee
//! wealthflow fee schedules/standard.yaml 2000000
//!
//! # Start an onboarding workflow for a household
//! wealthflow start client-onboarding --entity household:hh-42
//!
//! # Complete a step and see what started next
//! wealthflow complete <INSTANCE_ID> welcome_email --notes "Sent by Dana"
//!
//! # Inspect an instance
//! wealthflow status <INSTANCE_ID>
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use wealthflow::fees::{calculate_fee, load_fee_schedule, validate_schedule, BillingFrequency};
use wealthflow::workflow::{
    load_template, AdvanceReport, DependencyPolicy, EntityRef, FileInstanceStore, StepStatus,
    TemplateCatalog, TriggerContext, WorkflowEngine, WorkflowInstance, WorkflowService,
};
use wealthflow::{APP_NAME, VERSION};

/// Default directory for stored workflow instances.
const DEFAULT_STORE_DIR: &str = ".wealthflow";

/// Default directory holding workflow template YAML files.
const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Subcommand selected on the command line.
#[derive(Debug, PartialEq)]
enum Command {
    Fee { schedule: PathBuf, amount: f64 },
    ValidateSchedule { schedule: PathBuf },
    ValidateTemplate { template: PathBuf },
    Templates,
    Start { template_id: String },
    Complete { instance_id: String, step_id: String },
    Skip { instance_id: String, step_id: String },
    Fail { instance_id: String, step_id: String },
    Cancel { instance_id: String },
    Status { instance_id: String },
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    command: Command,
    store_dir: PathBuf,
    templates_dir: PathBuf,
    policy: DependencyPolicy,
    frequency: Option<BillingFrequency>,
    entity: Option<EntityRef>,
    triggered_by: Option<String>,
    notes: Option<String>,
    reason: Option<String>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: wealthflow <COMMAND> [ARGS] [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  fee <SCHEDULE_FILE> <AMOUNT>          Calculate the fee for a billable amount");
    println!("  validate-schedule <SCHEDULE_FILE>     Check a fee schedule for gaps and overlaps");
    println!("  validate-template <TEMPLATE_FILE>     Check a workflow template's step graph");
    println!("  templates                             List available workflow templates");
    println!("  start <TEMPLATE_ID>                   Start a workflow (requires --entity)");
    println!("  complete <INSTANCE_ID> <STEP_ID>      Mark a step completed");
    println!("  skip <INSTANCE_ID> <STEP_ID>          Skip a step");
    println!("  fail <INSTANCE_ID> <STEP_ID>          Mark a step failed");
    println!("  cancel <INSTANCE_ID>                  Cancel a workflow");
    println!("  status <INSTANCE_ID>                  Show a workflow's steps and history");
    println!();
    println!("Options:");
    println!("  --store DIR          Instance store directory (default: {})", DEFAULT_STORE_DIR);
    println!("  --templates DIR      Template directory (default: {})", DEFAULT_TEMPLATES_DIR);
    println!("  --policy POLICY      Dependency policy for new workflows: completed | completed-or-skipped");
    println!("  --frequency FREQ     Billing frequency for fee output");
    println!("  --entity TYPE:ID     Entity a workflow runs against (household, person, prospect, account)");
    println!("  --by USER            User starting the workflow");
    println!("  --notes TEXT         Notes recorded on a step");
    println!("  --reason TEXT        Cancellation reason");
    println!("  --verbose            Enable debug logging");
    println!("  --help               Show this help message");
    println!("  --version            Show version information");
}

/// Takes the value following an option flag.
fn option_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires a value", flag))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut positionals: Vec<String> = Vec::new();
    let mut store_dir = PathBuf::from(DEFAULT_STORE_DIR);
    let mut templates_dir = PathBuf::from(DEFAULT_TEMPLATES_DIR);
    let mut policy = DependencyPolicy::default();
    let mut frequency = None;
    let mut entity = None;
    let mut triggered_by = None;
    let mut notes = None;
    let mut reason = None;
    let mut verbose = false;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => verbose = true,
            "--store" => store_dir = PathBuf::from(option_value(args, &mut i, arg)?),
            "--templates" => templates_dir = PathBuf::from(option_value(args, &mut i, arg)?),
            "--policy" => policy = option_value(args, &mut i, arg)?.parse()?,
            "--frequency" => frequency = Some(option_value(args, &mut i, arg)?.parse()?),
            "--entity" => entity = Some(option_value(args, &mut i, arg)?.parse()?),
            "--by" => triggered_by = Some(option_value(args, &mut i, arg)?),
            "--notes" => notes = Some(option_value(args, &mut i, arg)?),
            "--reason" => reason = Some(option_value(args, &mut i, arg)?),
            flag if flag.starts_with('-') && flag.parse::<f64>().is_err() => {
                return Err(format!("Unknown option: {}", flag));
            }
            _ => positionals.push(arg.clone()),
        }
        i += 1;
    }

    let command = parse_command(&positionals)?;
    if matches!(command, Command::Start { .. }) && entity.is_none() {
        return Err("start requires --entity TYPE:ID".to_string());
    }

    Ok(Config {
        command,
        store_dir,
        templates_dir,
        policy,
        frequency,
        entity,
        triggered_by,
        notes,
        reason,
        verbose,
    })
}

/// Builds the subcommand from positional arguments.
fn parse_command(positionals: &[String]) -> Result<Command, String> {
    let (name, rest) = positionals
        .split_first()
        .ok_or_else(|| "No command given".to_string())?;

    let expect = |count: usize| -> Result<(), String> {
        if rest.len() == count {
            Ok(())
        } else {
            Err(format!(
                "'{}' expects {} argument(s), got {}",
                name,
                count,
                rest.len()
            ))
        }
    };

    let command = match name.as_str() {
        "fee" => {
            expect(2)?;
            let amount = rest[1]
                .parse()
                .map_err(|_| format!("Invalid amount: {}", rest[1]))?;
            Command::Fee {
                schedule: PathBuf::from(&rest[0]),
                amount,
            }
        }
        "validate-schedule" => {
            expect(1)?;
            Command::ValidateSchedule {
                schedule: PathBuf::from(&rest[0]),
            }
        }
        "validate-template" => {
            expect(1)?;
            Command::ValidateTemplate {
                template: PathBuf::from(&rest[0]),
            }
        }
        "templates" => {
            expect(0)?;
            Command::Templates
        }
        "start" => {
            expect(1)?;
            Command::Start {
                template_id: rest[0].clone(),
            }
        }
        "complete" | "skip" | "fail" => {
            expect(2)?;
            let (instance_id, step_id) = (rest[0].clone(), rest[1].clone());
            match name.as_str() {
                "complete" => Command::Complete { instance_id, step_id },
                "skip" => Command::Skip { instance_id, step_id },
                _ => Command::Fail { instance_id, step_id },
            }
        }
        "cancel" => {
            expect(1)?;
            Command::Cancel {
                instance_id: rest[0].clone(),
            }
        }
        "status" => {
            expect(1)?;
            Command::Status {
                instance_id: rest[0].clone(),
            }
        }
        other => return Err(format!("Unknown command: {}", other)),
    };

    Ok(command)
}

/// Colors a step status for terminal output.
fn paint_status(status: StepStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        StepStatus::Pending => label.dimmed(),
        StepStatus::InProgress => label.yellow(),
        StepStatus::Completed => label.green(),
        StepStatus::Skipped => label.blue(),
        StepStatus::Failed => label.red(),
    }
}

fn print_report(report: &AdvanceReport) {
    for step_id in &report.started {
        println!("  {} {}", "started".yellow(), step_id);
    }
    if report.instance_completed {
        println!("  {}", "workflow completed".green().bold());
    }
}

fn print_instance(instance: &WorkflowInstance, service: &WorkflowService<FileInstanceStore>) {
    println!(
        "{} {} ({})",
        "Workflow".bold(),
        instance.id,
        instance.status.to_string().bold()
    );
    println!("  Template: {}", instance.template_id);
    println!("  Policy:   {:?}", instance.policy);
    println!(
        "  Entity:   {:?} {}",
        instance.entity.entity_type, instance.entity.entity_id
    );
    if let Some(reason) = instance.cancellation_reason() {
        println!("  Cancelled: {}", reason);
    }
    println!();

    // Template order and step names when the template is still available
    let template = service.template_for(instance).ok();
    let order: Vec<&str> = match template {
        Some(template) => template.steps.iter().map(|s| s.id.as_str()).collect(),
        None => instance.step_statuses.keys().map(String::as_str).collect(),
    };
    for step_id in order {
        let Some(state) = instance.step_statuses.get(step_id) else {
            continue;
        };
        let name = template
            .and_then(|t| t.get_step(step_id))
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(step_id);
        let notes = state.notes.as_deref().unwrap_or("");
        println!("  {:28} {:12} {}", name, paint_status(state.status), notes);
    }

    if !instance.history.is_empty() {
        println!();
        println!("{}", "History".bold());
        print!("{}", instance.history.render());
    }
}

fn run_fee(
    schedule_path: &Path,
    amount: f64,
    frequency: Option<BillingFrequency>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = load_fee_schedule(schedule_path)?;
    let result = calculate_fee(&schedule, amount)?;
    let frequency = frequency.unwrap_or(schedule.frequency);

    println!("{} {}", "Schedule".bold(), schedule.id);
    println!("  Billable amount: {:.2}", amount);
    println!();
    for tier in &result.breakdown {
        println!(
            "  {:24} {:>16.2} @ {:>7.4}% = {:>12.2}",
            tier.tier_name, tier.amount, tier.rate, tier.fee
        );
    }
    println!();
    println!("  Annual fee:      {}", format!("{:.2}", result.fee_amount).green().bold());
    println!("  Effective rate:  {:.4}%", result.effective_rate);
    println!("  {} fee: {:.2}", frequency, result.period_fee(frequency));
    Ok(())
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    info!("{} v{}", APP_NAME, VERSION);

    match &config.command {
        Command::Fee { schedule, amount } => return run_fee(schedule, *amount, config.frequency),
        Command::ValidateSchedule { schedule } => {
            let schedule = load_fee_schedule(schedule)?;
            let issues = validate_schedule(&schedule);
            if issues.is_empty() {
                println!("{} schedule '{}' is well-formed", "ok".green(), schedule.id);
                return Ok(());
            }
            for issue in &issues {
                println!("{} {}", "issue".yellow(), issue);
            }
            return Err(format!("{} issue(s) found", issues.len()).into());
        }
        Command::ValidateTemplate { template } => {
            let template = load_template(template)?;
            println!(
                "{} template '{}' ({} steps, status {})",
                "ok".green(),
                template.id,
                template.len(),
                template.status
            );
            if !template.is_active() {
                println!(
                    "{} status is {}; set `status: active` before starting workflows from it",
                    "warning".yellow(),
                    template.status
                );
            }
            return Ok(());
        }
        _ => {}
    }

    let catalog = TemplateCatalog::load_dir(&config.templates_dir).map_err(|e| {
        error!(
            "Failed to load templates from {}: {}",
            config.templates_dir.display(),
            e
        );
        e
    })?;
    let store = FileInstanceStore::open(&config.store_dir)?;
    let service = WorkflowService::new(WorkflowEngine::with_policy(config.policy), catalog, store);
    let notes = config.notes.as_deref();

    match config.command {
        Command::Templates => {
            for id in service.catalog().ids() {
                let template = service.catalog().get(id)?;
                println!("{:32} {:10} {} steps", id, template.status.to_string(), template.len());
            }
        }
        Command::Start { template_id } => {
            let Some(entity) = config.entity else {
                return Err("start requires --entity TYPE:ID".into());
            };
            let mut context = TriggerContext::new(entity);
            if let Some(user) = config.triggered_by {
                context = context.triggered_by(user);
            }
            let (instance, report) = service.start(&template_id, context)?;
            println!("{} {}", "Started".green().bold(), instance.id);
            print_report(&report);
        }
        Command::Complete { instance_id, step_id } => {
            let (_, report) = service.complete_step(&instance_id, &step_id, notes)?;
            println!("{} {}", "completed".green(), step_id);
            print_report(&report);
        }
        Command::Skip { instance_id, step_id } => {
            let (_, report) = service.skip_step(&instance_id, &step_id, notes)?;
            println!("{} {}", "skipped".blue(), step_id);
            print_report(&report);
        }
        Command::Fail { instance_id, step_id } => {
            let (_, report) = service.fail_step(&instance_id, &step_id, notes)?;
            println!("{} {}", "failed".red(), step_id);
            print_report(&report);
            for blocked in service.blocked_steps(&instance_id)? {
                println!(
                    "  {} {} (waiting on {})",
                    "blocked".red(),
                    blocked.step_id,
                    blocked.blocked_by.join(", ")
                );
            }
        }
        Command::Cancel { instance_id } => {
            let instance = service.cancel(&instance_id, config.reason.as_deref())?;
            println!("{} {}", "Cancelled".red().bold(), instance.id);
        }
        Command::Status { instance_id } => {
            let instance = service.get(&instance_id)?;
            print_instance(&instance, &service);
        }
        Command::Fee { .. } | Command::ValidateSchedule { .. } | Command::ValidateTemplate { .. } => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
