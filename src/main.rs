use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use colored::Colorize;
use lending_system::{
    Clock, CompositeNotifier, EmailNotifier, Holder, InMemoryCatalog, InMemoryLedger,
    LendingConfig, LendingReport, LendingService, NoopNotifier, Notifier, Resource, SmsNotifier,
    SystemClock, TransitionLogger,
};
use rand::Rng;
use tracing_subscriber::EnvFilter;

/// Which notification sink the demo wires in
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NotifierKind {
    /// Discard notifications
    None,
    /// Email-style notifications
    Email,
    /// SMS-style notifications
    Sms,
    /// Email and SMS
    Both,
}

/// Command-line arguments for the lending demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose output with detailed operation logs
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with lending policy settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Notification sink to use for borrow confirmations
    #[arg(long, value_enum, default_value_t = NotifierKind::Email)]
    notifier: NotifierKind,

    /// Race this many threads to borrow the same resource
    #[arg(long)]
    contention: Option<usize>,

    /// Print a JSON snapshot of the final state
    #[arg(long)]
    json: bool,
}

/// Demo service type
type Service = LendingService<InMemoryCatalog, InMemoryLedger>;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => match LendingConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {e}", "error:".red().bold());
                return ExitCode::FAILURE;
            }
        },
        None => LendingConfig::default(),
    };

    println!("{}", "Lending System Demonstration".green().bold());
    println!("=====================================\n");

    let mut service = LendingService::in_memory(build_notifier(args.notifier), config);
    service.register_observer(Box::new(TransitionLogger));

    if let Err(e) = basic_demo(&service) {
        eprintln!("{} {e}", "error:".red().bold());
        return ExitCode::FAILURE;
    }

    if let Some(threads) = args.contention {
        contention_demo(&service, threads);
    }

    catalog_summary(&service);

    println!("\n{}", "Transition history".yellow().bold());
    println!("{}", LendingReport::history_table(&service.history()));
    println!("{}", LendingReport::loan_table(&service.snapshot(), SystemClock.now()));

    if args.json {
        match serde_json::to_string_pretty(&service.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{} {e}", "error:".red().bold());
                return ExitCode::FAILURE;
            }
        }
    }

    println!("\n{}", "Demonstration complete!".green().bold());
    ExitCode::SUCCESS
}

/// Install a fmt subscriber honouring `RUST_LOG`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Build the sink selected on the command line
fn build_notifier(kind: NotifierKind) -> Box<dyn Notifier> {
    match kind {
        NotifierKind::None => Box::new(NoopNotifier),
        NotifierKind::Email => Box::new(EmailNotifier),
        NotifierKind::Sms => Box::new(SmsNotifier),
        NotifierKind::Both => Box::new(
            CompositeNotifier::new().with(Box::new(EmailNotifier)).with(Box::new(SmsNotifier)),
        ),
    }
}

/// Add two books, then borrow, list and return one of them
fn basic_demo(service: &Service) -> lending_system::Result<()> {
    println!("{}", "Running basic demonstration...".yellow().bold());

    let book1 = Resource::new("1", "Clean Code")
        .with_author("Robert Martin")
        .with_isbn("978-0132350884");
    let book2 = Resource::new("2", "Design Patterns")
        .with_author("Gang of Four")
        .with_isbn("978-0201633610");
    service.add_resource(book1.clone())?;
    service.add_resource(book2)?;

    let member = Holder::new("M1", "john@example.com")
        .with_name("John Doe")
        .with_membership("regular");

    if service.borrow_for(&book1.id, &member)? {
        println!("{} {}", "Successfully borrowed:".green(), book1.title);
    }

    println!("Borrowed books for {}:", member.name);
    for book in service.list_borrowed(&member.id) {
        println!("- {}", book.title);
    }

    if service.return_resource(&book1.id, &member.id)? {
        println!("{} {}", "Successfully returned:".green(), book1.title);
    }

    println!("{service}");
    Ok(())
}

/// Print each resource's status and the per-status totals
fn catalog_summary(service: &Service) {
    let snapshot = service.snapshot();

    println!("\n{}", "Catalog".yellow().bold());
    for resource in &snapshot.resources {
        let status = resource.availability;
        println!("- {} [{status}]: {}", resource.title, status.get_description());
    }

    let counts = LendingReport::status_counts(&snapshot)
        .into_iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Status counts: {counts}");
}

/// Many threads race for one resource; exactly one should win
fn contention_demo(service: &Service, threads: usize) {
    println!("\n{}", format!("Racing {threads} threads for one resource...").yellow().bold());

    let outcome = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                s.spawn(move |_| {
                    let mut rng = rand::rng();
                    std::thread::sleep(std::time::Duration::from_micros(rng.random_range(0..50)));
                    let holder = format!("M{i}");
                    (holder.clone(), service.borrow("2", &holder, &format!("{holder}@example.com")))
                })
            })
            .collect();
        handles.into_iter().filter_map(|h| h.join().ok()).collect::<Vec<_>>()
    });

    let Ok(results) = outcome else {
        println!("{}", "A contention thread panicked".red());
        return;
    };

    for (holder, result) in &results {
        match result {
            Ok(true) => println!("{} {holder}", "Won by".green().bold()),
            Ok(false) => println!("{} {holder}", "Rejected".blue()),
            Err(e) => println!("{} {holder}: {e}", "Failed".red()),
        }
    }

    let winners = results.iter().filter(|(_, r)| matches!(r, Ok(true))).count();
    println!("Winners: {winners} of {}", results.len());
}
