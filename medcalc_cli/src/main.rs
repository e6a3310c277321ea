use clap::{Parser, Subcommand};
use medcalc_core::calculators::{registry, FieldKind};
use medcalc_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "medcalc")]
#[command(about = "Medical calculators with a shared patient profile", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List calculators (default)
    List {
        /// Filter by text in id, name, description or tags
        #[arg(long)]
        search: Option<String>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a calculator's fields
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Evaluate a calculator once
    Calc {
        id: String,

        /// Field assignment, e.g. --set weight=70 (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        #[arg(long)]
        json: bool,
    },

    /// Interactive session with a shared patient profile (reads commands from stdin)
    Session {
        /// Calculators to open at start, in addition to the configured ones
        #[arg(long = "open")]
        open: Vec<String>,
    },
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn main() {
    // Initialize logging
    medcalc_core::logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let errors = registry().validate();
    if !errors.is_empty() {
        eprintln!("Calculator table validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Registry("invalid calculator table".into()));
    }

    match cli.command {
        Some(Commands::List {
            search,
            category,
            json,
        }) => cmd_list(search, category, json),
        Some(Commands::Show { id, json }) => cmd_show(&id, json),
        Some(Commands::Calc { id, set, json }) => cmd_calc(&id, set, json, &config),
        Some(Commands::Session { open }) => cmd_session(open, &config),
        None => cmd_list(None, None, false),
    }
}

// ============================================================================
// One-shot commands
// ============================================================================

fn cmd_list(search: Option<String>, category: Option<String>, json: bool) -> Result<()> {
    let category = match category {
        Some(c) => Some(
            calculators::Category::parse(&c)
                .ok_or_else(|| Error::Other(format!("unknown category: {}", c)))?,
        ),
        None => None,
    };

    let found: Vec<&CalculatorDef> = registry()
        .search(search.as_deref().unwrap_or(""))
        .into_iter()
        .filter(|c| category.map_or(true, |cat| c.category == cat))
        .collect();

    if json {
        let rows: Vec<_> = found
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "category": c.category,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("No calculators match.");
        return Ok(());
    }
    for calc in found {
        println!("{:<20} {:<15} {}", calc.id, calc.category, calc.name);
    }
    Ok(())
}

fn cmd_show(id: &str, json: bool) -> Result<()> {
    let def = get_calculator(id).ok_or_else(|| Error::UnknownCalculator(id.to_string()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(def)?);
        return Ok(());
    }

    println!("{} ({})", def.name, def.id);
    println!("  {}", def.description);
    println!();
    for field in &def.fields {
        let marker = if field.shared().is_some() { "*" } else { " " };
        let optional = if field.optional { " (optional)" } else { "" };
        println!(
            "  {}{:<18} {}{}  [{}]",
            marker,
            field.key,
            field.label,
            optional,
            describe_kind(&field.kind)
        );
    }
    println!();
    println!("  * shared with the patient profile");
    Ok(())
}

fn cmd_calc(id: &str, set: Vec<(String, String)>, json: bool, config: &Config) -> Result<()> {
    let mut session = Session::new(config.suggestions.equality, config.profile.history_limit);
    let instance = session.mount(id)?;
    let calc = session
        .get_mut(instance)
        .ok_or_else(|| Error::UnknownInstance(instance.to_string()))?;

    for (key, _) in &set {
        if calc.def.field(key).is_none() {
            return Err(Error::Other(format!(
                "calculator '{}' has no field '{}'",
                id, key
            )));
        }
    }
    calc.sync.update_fields(set);

    let outcome = calc
        .evaluate()
        .map_err(|e| Error::Other(format!("cannot calculate {}: {}", id, e)))?;

    if json {
        let body = serde_json::json!({
            "calculator": calc.def.id,
            "values": calc.sync.values(),
            "result": outcome,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", calc.def.name);
        print_outcome(&outcome, config.display.decimals);
    }
    Ok(())
}

// ============================================================================
// Interactive session
// ============================================================================

fn cmd_session(open: Vec<String>, config: &Config) -> Result<()> {
    let mut session = Session::from_config(config)?;
    for id in &open {
        session.mount(id)?;
    }

    tracing::info!(calculators = session.len(), "Starting interactive session");
    println!("medcalc session. Type 'help' for commands.");
    for (index, calc) in session.iter().enumerate() {
        render_calculator(index, calc, config.display.decimals);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        match execute(&mut session, &words, config) {
            Ok(SessionFlow::Continue) => {}
            Ok(SessionFlow::Quit) => break,
            Err(e) => {
                tracing::debug!(command = words[0], error = %e, "Session command failed");
                println!("error: {}", e);
            }
        }
    }
    tracing::info!("Session ended");
    Ok(())
}

enum SessionFlow {
    Continue,
    Quit,
}

fn execute(session: &mut Session, words: &[&str], config: &Config) -> Result<SessionFlow> {
    let decimals = config.display.decimals;
    match words {
        ["help"] => print_help(),
        ["quit"] | ["exit"] => return Ok(SessionFlow::Quit),
        ["open", id] => {
            let instance = session.mount(id)?;
            let index = session.len() - 1;
            if let Some(calc) = session.get(instance) {
                render_calculator(index, calc, decimals);
            }
        }
        ["close", n] => {
            let instance = resolve(session, n)?;
            session.unmount(instance)?;
            println!("Closed [{}]", n);
        }
        ["list"] => {
            for (index, calc) in session.iter().enumerate() {
                render_summary(index, calc);
            }
        }
        ["show", n] => {
            let instance = resolve(session, n)?;
            let index = position_of(session, instance);
            if let Some(calc) = session.get(instance) {
                render_calculator(index, calc, decimals);
            }
        }
        ["set", n, key, rest @ ..] => {
            let instance = resolve(session, n)?;
            let calc = mounted_mut(session, instance)?;
            if calc.def.field(key).is_none() {
                return Err(Error::Other(format!(
                    "{} has no field '{}'",
                    calc.def.id, key
                )));
            }
            calc.sync.update_field(key, rest.join(" "));
            rerender(session, instance, decimals);
        }
        ["sync", n] => {
            let instance = resolve(session, n)?;
            let applied = mounted_mut(session, instance)?.sync.sync_all();
            if applied.is_empty() {
                println!("Nothing to sync.");
            }
            rerender(session, instance, decimals);
        }
        ["sync", n, field] => {
            let instance = resolve(session, n)?;
            let field: SharedField = field.parse()?;
            if !mounted_mut(session, instance)?.sync.sync_field(field) {
                println!("No suggestion for {}.", field);
            }
            rerender(session, instance, decimals);
        }
        ["reset", n] => {
            let instance = resolve(session, n)?;
            mounted_mut(session, instance)?.sync.reset();
            rerender(session, instance, decimals);
        }
        ["clear"] => {
            session.clear_profile();
            rerender_changed(session, None);
        }
        ["profile"] => print_profile(session.store()),
        ["history"] => {
            for change in session.store().history() {
                let fields: Vec<&str> = change.fields.iter().map(|f| f.as_str()).collect();
                println!(
                    "#{:<4} {}  {:?}  {}",
                    change.revision,
                    change.at.format("%H:%M:%S"),
                    change.kind,
                    fields.join(", ")
                );
            }
        }
        _ => {
            return Err(Error::Other(format!(
                "unknown command '{}'; type 'help'",
                words.join(" ")
            )))
        }
    }
    Ok(SessionFlow::Continue)
}

fn resolve(session: &Session, n: &str) -> Result<Uuid> {
    n.parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| session.instance_at(i))
        .ok_or_else(|| Error::UnknownInstance(n.to_string()))
}

fn mounted_mut(session: &mut Session, instance: Uuid) -> Result<&mut MountedCalculator> {
    session
        .get_mut(instance)
        .ok_or_else(|| Error::UnknownInstance(instance.to_string()))
}

fn position_of(session: &Session, instance: Uuid) -> usize {
    session
        .iter()
        .position(|m| m.instance == instance)
        .unwrap_or_default()
}

/// Render the edited calculator, then every other one the profile change reached
fn rerender(session: &Session, instance: Uuid, decimals: Option<usize>) {
    if let Some(calc) = session.get(instance) {
        render_calculator(position_of(session, instance), calc, decimals);
    }
    rerender_changed(session, Some(instance));
}

fn rerender_changed(session: &Session, skip: Option<Uuid>) {
    for instance in session.take_changed() {
        if Some(instance) == skip {
            continue;
        }
        if let Some(calc) = session.get(instance) {
            render_summary(position_of(session, instance), calc);
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Blank => "blank",
        SyncStatus::Editing => "editing",
        SyncStatus::SuggestionAvailable => "suggestion available",
        SyncStatus::Synced => "synced",
    }
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Number { unit, min, max } if unit.is_empty() => format!("{}..{}", min, max),
        FieldKind::Number { unit, min, max } => format!("{}..{} {}", min, max, unit),
        FieldKind::Choice { options } => options.join(" | "),
        FieldKind::Flag => "yes | no".to_string(),
    }
}

fn render_summary(index: usize, calc: &MountedCalculator) {
    let suggestions = calc.sync.suggestions();
    let mut line = format!(
        "[{}] {} - {}",
        index + 1,
        calc.def.id,
        status_label(calc.sync.status())
    );
    if !suggestions.is_empty() {
        let offered: Vec<String> = suggestions
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect();
        line.push_str(&format!(": {}", offered.join(", ")));
    }
    println!("{}", line);
}

fn render_calculator(index: usize, calc: &MountedCalculator, decimals: Option<usize>) {
    let suggestions = calc.sync.suggestions();
    println!(
        "[{}] {} ({}) - {}",
        index + 1,
        calc.def.name,
        calc.def.id,
        status_label(calc.sync.status())
    );

    for field in &calc.def.fields {
        let value = calc
            .sync
            .value(field.key)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let shown = if value.is_empty() { "-".to_string() } else { value };
        let offer = field
            .shared()
            .and_then(|f| suggestions.get(f))
            .map(|v| format!("   <- profile has {}", v))
            .unwrap_or_default();
        let marker = if field.shared().is_some() { "*" } else { " " };
        println!("    {}{:<18} {}{}", marker, field.key, shown, offer);
    }

    match calc.evaluate() {
        Ok(outcome) => print_outcome(&outcome, decimals),
        Err(e) => println!("    ({})", e),
    }
}

fn print_outcome(outcome: &Outcome, decimals: Option<usize>) {
    println!("    = {}  {}", outcome.format_value(decimals), outcome.interpretation);
    for (label, value) in &outcome.details {
        println!("      {}: {}", label, value);
    }
}

fn print_profile(store: &ProfileStore) {
    let profile = store.get();
    if profile.is_empty() {
        println!("Patient profile is empty.");
        return;
    }
    for (field, value) in profile.iter_set() {
        println!("  {:<16} {}", field.as_str(), value);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <id>               mount a calculator");
    println!("  close <n>               unmount calculator n");
    println!("  list                    summary of mounted calculators");
    println!("  show <n>                render calculator n");
    println!("  set <n> <field> [value] set a field (blank value clears it)");
    println!("  sync <n> [field]        accept profile suggestions");
    println!("  reset <n>               reset calculator n to its defaults");
    println!("  clear                   clear the patient profile");
    println!("  profile                 show the patient profile");
    println!("  history                 recent profile changes");
    println!("  quit                    leave the session");
}
