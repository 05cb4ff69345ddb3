//! CLI binary for managing household loans and the transaction ledger.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use loanbook::error::LoanbookError;
use loanbook::ledger::TransactionFilter;
use loanbook::loans::{LoanManagerBlocking, LoanSummary};
use loanbook::models::{
    DEFAULT_MEMBER, Installment, Loan, LoanId, LoanStatus, Setting, Transaction, TransactionType,
};
use loanbook::notify::{Notifier, NotifyLevel};
use loanbook::schedule;
use loanbook::storage::{BlockingStorage, FileStorage};
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

/// Environment variable overriding the storage directory.
const DATA_DIR_ENV: &str = "LOANBOOK_DATA_DIR";

/// Placeholder for empty table cells.
const EMPTY: &str = "\u{2014}";

/// Loanbook CLI: track loans, their schedules and household transactions.
#[derive(Debug, Parser)]
#[command(name = "loanbook", version, about)]
struct Cli {
    /// Override the storage directory (default: `$LOANBOOK_DATA_DIR`, then
    /// the XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List all loans.
    Loans,
    /// Create a loan.
    Add(AddArgs),
    /// Show a loan with its schedule and payments.
    Show {
        /// Loan id.
        id: String,
    },
    /// Print the schedule for ad-hoc terms without storing anything.
    Preview(TermsArgs),
    /// Register a payment against a loan.
    Pay {
        /// Loan id.
        id: String,
        /// Amount paid.
        #[arg(value_parser = parse_decimal)]
        amount: Decimal,
        /// Payment date (YYYY-MM-DD, default: today).
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Household member who paid (default: the `defaultMember` setting).
        #[arg(long)]
        member: Option<String>,
    },
    /// Revert the most recent payment of a loan.
    Undo {
        /// Loan id.
        id: String,
    },
    /// Delete a loan and every transaction it generated.
    Delete {
        /// Loan id.
        id: String,
    },
    /// Show totals over all loans.
    Summary,
    /// List transactions, optionally filtered.
    Transactions(TransactionArgs),
    /// Read or write a stored preference.
    Config {
        /// Config action.
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

/// `config` actions.
#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print a setting.
    Get {
        /// Setting name (e.g. `defaultMember`).
        key: String,
    },
    /// Store a setting.
    Set {
        /// Setting name (e.g. `defaultMember`).
        key: String,
        /// Value to store.
        value: String,
    },
}

/// Loan terms shared by `add` and `preview`.
#[derive(Debug, Args)]
struct TermsArgs {
    /// Principal.
    #[arg(long, value_parser = parse_decimal)]
    amount: Decimal,
    /// Number of monthly installments.
    #[arg(long)]
    installments: Option<u32>,
    /// Annual interest rate in percent.
    #[arg(long, value_parser = parse_decimal)]
    rate: Option<Decimal>,
    /// Start date (YYYY-MM-DD, default: today).
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,
    /// Due date of the first installment (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    first_date: Option<NaiveDate>,
    /// Regular installment amount (default: the level payment).
    #[arg(long, value_parser = parse_decimal)]
    installment_amount: Option<Decimal>,
    /// Override for the first installment amount.
    #[arg(long, value_parser = parse_decimal)]
    first_amount: Option<Decimal>,
    /// Override for the last installment amount.
    #[arg(long, value_parser = parse_decimal)]
    last_amount: Option<Decimal>,
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Loan name.
    #[arg(long)]
    name: String,
    /// Loan terms.
    #[command(flatten)]
    terms: TermsArgs,
    /// Who lent the money.
    #[arg(long)]
    lender: Option<String>,
    /// Free-form notes.
    #[arg(long)]
    notes: Option<String>,
    /// Record the disbursement in the ledger with this type.
    #[arg(long, value_enum, value_name = "TYPE")]
    initial: Option<KindArg>,
}

/// Arguments for the `transactions` subcommand.
#[derive(Debug, Args)]
struct TransactionArgs {
    /// Start date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Income or expense.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
    /// Filter by category (case-insensitive).
    #[arg(long)]
    category: Option<String>,
    /// Filter by household member.
    #[arg(long)]
    member: Option<String>,
    /// Filter by linked loan id.
    #[arg(long)]
    loan: Option<String>,
    /// Filter by description (case-insensitive substring match).
    #[arg(long)]
    description: Option<String>,
    /// Minimum amount.
    #[arg(long, value_parser = parse_decimal)]
    min_amount: Option<Decimal>,
    /// Maximum amount.
    #[arg(long, value_parser = parse_decimal)]
    max_amount: Option<Decimal>,
}

/// Transaction type as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// Money in.
    Income,
    /// Money out.
    Expense,
}

impl From<KindArg> for TransactionType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => Self::Income,
            KindArg::Expense => Self::Expense,
        }
    }
}

/// Prints manager notifications to stderr.
#[derive(Debug, Clone, Copy)]
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        let mut err = io::stderr().lock();
        let _ignored = match level {
            NotifyLevel::Success => writeln!(err, "{} {message}", "ok:".green().bold()),
            NotifyLevel::Info => writeln!(err, "{} {message}", "info:".cyan()),
            NotifyLevel::Warning => writeln!(err, "{} {message}", "warning:".yellow().bold()),
            NotifyLevel::Error => writeln!(err, "{} {message}", "error:".red().bold()),
        };
    }
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a decimal amount for clap.
fn parse_decimal(s: &str) -> Result<Decimal, String> {
    s.trim().parse::<Decimal>().map_err(|err| format!("{err}"))
}

/// Today in local time.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Picks the storage directory: the flag, then the environment, then the
/// platform default.
fn resolve_data_dir(
    flag: Option<PathBuf>,
    env: Option<String>,
) -> loanbook::error::Result<PathBuf> {
    match flag.or_else(|| env.filter(|dir| !dir.is_empty()).map(PathBuf::from)) {
        Some(dir) => Ok(dir),
        None => FileStorage::default_dir(),
    }
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    let _dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let storage = match resolve_data_dir(cli.data_dir, std::env::var(DATA_DIR_ENV).ok())
        .and_then(FileStorage::new)
    {
        Ok(storage) => storage,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to initialize storage: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let manager = match LoanManagerBlocking::builder()
        .storage(storage)
        .notifier(ConsoleNotifier)
        .build()
    {
        Ok(manager) => manager,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build loan manager: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    dispatch(&manager, cli.command)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::Loans => cmd_loans(manager),
        Command::Add(args) => cmd_add(manager, args),
        Command::Show { id } => cmd_show(manager, &LoanId::from(id)),
        Command::Preview(terms) => cmd_preview(&terms),
        Command::Pay {
            id,
            amount,
            date,
            member,
        } => cmd_pay(manager, &LoanId::from(id), amount, date, member),
        Command::Undo { id } => cmd_undo(manager, &LoanId::from(id)),
        Command::Delete { id } => cmd_delete(manager, &LoanId::from(id)),
        Command::Summary => cmd_summary(manager),
        Command::Transactions(args) => cmd_transactions(manager, &args),
        Command::Config { action } => cmd_config(manager.storage(), action),
    }
}

/// Writes an error line to stderr and returns a failure exit code.
fn fail(context: &str, err: &LoanbookError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Builds a loan from CLI terms.
///
/// Without an explicit installment amount the level payment is stored, so
/// `add` keeps the schedule `preview` shows.
fn loan_from_terms(name: String, terms: &TermsArgs) -> Loan {
    let mut loan = Loan::new(name, terms.amount, terms.start.unwrap_or_else(today));
    loan.installments = terms.installments;
    loan.interest_rate = terms.rate;
    loan.installment_amount = terms.installment_amount.or_else(|| {
        terms.installments.filter(|count| *count > 0).map(|count| {
            schedule::level_payment(terms.amount, schedule::monthly_rate(terms.rate), count)
        })
    });
    loan.first_installment_date = terms.first_date;
    loan.first_installment_amount = terms.first_amount;
    loan.last_installment_amount = terms.last_amount;
    loan
}

/// Executes the `loans` subcommand.
fn cmd_loans<S: BlockingStorage>(manager: &LoanManagerBlocking<S>) -> io::Result<ExitCode> {
    match manager.get_all() {
        Ok(loans) => {
            print_loans_table(&loans)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read loans", &err),
    }
}

/// Executes the `add` subcommand.
fn cmd_add<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    args: AddArgs,
) -> io::Result<ExitCode> {
    let mut loan = loan_from_terms(args.name, &args.terms);
    loan.lender = args.lender;
    loan.notes = args.notes;
    if let Some(kind) = args.initial {
        loan = loan.with_initial_transaction(kind.into());
    }
    match manager.add(loan) {
        Ok(id) => {
            writeln!(io::stdout().lock(), "{id}")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to add loan", &err),
    }
}

/// Executes the `show` subcommand.
fn cmd_show<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    id: &LoanId,
) -> io::Result<ExitCode> {
    match manager.get(id) {
        Ok(Some(loan)) => {
            print_loan_detail(&loan)?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            writeln!(
                io::stderr().lock(),
                "{} loan not found: {id}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => fail("failed to read loan", &err),
    }
}

/// Executes the `preview` subcommand.
fn cmd_preview(terms: &TermsArgs) -> io::Result<ExitCode> {
    let loan = loan_from_terms("preview".to_owned(), terms);
    print_schedule_table(&schedule::compute_schedule(&loan))?;
    Ok(ExitCode::SUCCESS)
}

/// Looks up the member applied to payments that name none.
fn default_member<S: BlockingStorage>(storage: &S) -> loanbook::error::Result<Option<String>> {
    Ok(storage
        .get::<Setting>(DEFAULT_MEMBER)?
        .and_then(|setting| setting.as_text().map(str::to_owned)))
}

/// Executes the `pay` subcommand.
fn cmd_pay<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    id: &LoanId,
    amount: Decimal,
    date: Option<NaiveDate>,
    member: Option<String>,
) -> io::Result<ExitCode> {
    let payer = match member {
        Some(name) => Some(name),
        None => match default_member(manager.storage()) {
            Ok(name) => name,
            Err(err) => return fail("failed to read settings", &err),
        },
    };
    match manager.register_payment(id, amount, date.unwrap_or_else(today), payer) {
        Ok(loan) => {
            writeln!(
                io::stdout().lock(),
                "{} paid {} of {} ({})",
                loan.name.bold(),
                money(loan.paid_amount),
                money(loan.amount.unwrap_or_default()),
                status_label(loan.status)
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to register payment", &err),
    }
}

/// Executes the `undo` subcommand.
fn cmd_undo<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    id: &LoanId,
) -> io::Result<ExitCode> {
    match manager.undo_last_payment(id) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => fail("failed to undo payment", &err),
    }
}

/// Executes the `delete` subcommand.
fn cmd_delete<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    id: &LoanId,
) -> io::Result<ExitCode> {
    match manager.delete(id) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => fail("failed to delete loan", &err),
    }
}

/// Executes the `summary` subcommand.
fn cmd_summary<S: BlockingStorage>(manager: &LoanManagerBlocking<S>) -> io::Result<ExitCode> {
    match manager.summary() {
        Ok(summary) => {
            print_summary(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to summarize loans", &err),
    }
}

/// Builds a [`TransactionFilter`] from CLI arguments.
fn build_transaction_filter(args: &TransactionArgs) -> TransactionFilter {
    let mut filter = TransactionFilter::new();
    if let Some(from) = args.from {
        filter = filter.since(from);
    }
    if let Some(to) = args.to {
        filter = filter.until(to);
    }
    if let Some(kind) = args.kind {
        filter = filter.kind(kind.into());
    }
    if let Some(category) = args.category.as_deref() {
        filter = filter.category(category);
    }
    if let Some(member) = args.member.as_deref() {
        filter = filter.member(member);
    }
    if let Some(loan) = args.loan.as_deref() {
        filter = filter.loan(LoanId::from(loan));
    }
    if let Some(text) = args.description.as_deref() {
        filter = filter.description(text);
    }
    if let Some(min) = args.min_amount {
        filter = filter.min_amount(min);
    }
    if let Some(max) = args.max_amount {
        filter = filter.max_amount(max);
    }
    filter
}

/// Executes the `transactions` subcommand.
fn cmd_transactions<S: BlockingStorage>(
    manager: &LoanManagerBlocking<S>,
    args: &TransactionArgs,
) -> io::Result<ExitCode> {
    match manager.ledger().get_all(&build_transaction_filter(args)) {
        Ok(txs) => {
            print_transactions_table(&txs)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read transactions", &err),
    }
}

/// Executes the `config` subcommand.
fn cmd_config<S: BlockingStorage>(storage: &S, action: ConfigCommand) -> io::Result<ExitCode> {
    match action {
        ConfigCommand::Get { key } => match storage.get::<Setting>(&key) {
            Ok(Some(setting)) => {
                let text = setting
                    .as_text()
                    .map_or_else(|| setting.value.to_string(), str::to_owned);
                writeln!(io::stdout().lock(), "{text}")?;
                Ok(ExitCode::SUCCESS)
            }
            Ok(None) => {
                writeln!(io::stderr().lock(), "{} {key} is not set", "warning:".yellow())?;
                Ok(ExitCode::FAILURE)
            }
            Err(err) => fail("failed to read settings", &err),
        },
        ConfigCommand::Set { key, value } => {
            let setting = Setting::new(key, serde_json::Value::String(value));
            match storage.put(&setting) {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(err) => fail("failed to write settings", &err),
            }
        }
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Formats an amount rounded to cents.
fn money(value: Decimal) -> String {
    format!("{:.2}", loanbook::money::round_cents(value))
}

/// Human-readable loan status.
const fn status_label(status: LoanStatus) -> &'static str {
    match status {
        LoanStatus::Active => "active",
        LoanStatus::Completed => "completed",
    }
}

/// Prints loans in a table.
fn print_loans_table(loans: &[Loan]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if loans.is_empty() {
        writeln!(out, "{}", "No loans found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Paid").fg(Color::Cyan),
        Cell::new("Remaining").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for loan in loans {
        let id = loan.id.as_ref().map_or_else(|| EMPTY.to_owned(), ToString::to_string);
        let status_cell = match loan.status {
            LoanStatus::Active => Cell::new(status_label(loan.status)).fg(Color::Yellow),
            LoanStatus::Completed => Cell::new(status_label(loan.status)).fg(Color::Green),
        };
        _ = table.add_row(vec![
            Cell::new(id),
            Cell::new(&loan.name),
            Cell::new(money(loan.amount.unwrap_or_default())),
            Cell::new(money(loan.paid_amount)),
            Cell::new(money(loan.remaining())),
            status_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Loans".green().bold(),
        format_args!("({})", loans.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints one loan: terms, schedule and payments.
fn print_loan_detail(loan: &Loan) -> io::Result<()> {
    {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{} {}",
            loan.name.green().bold(),
            format_args!("({})", status_label(loan.status)).dimmed()
        )?;
        let rows = [
            ("Lender", loan.lender.clone()),
            ("Amount", loan.amount.map(money)),
            ("Rate", loan.interest_rate.map(|rate| format!("{rate}%"))),
            ("Installments", loan.installments.map(|count| count.to_string())),
            ("Start", loan.start_date.map(|date| date.to_string())),
            ("Paid", Some(money(loan.paid_amount))),
            ("Remaining", Some(money(loan.remaining()))),
            ("Notes", loan.notes.clone()),
        ];
        for (label, value) in rows {
            writeln!(
                out,
                "  {} {}",
                format_args!("{label}:").bold(),
                value.as_deref().unwrap_or(EMPTY)
            )?;
        }
        writeln!(out)?;
    }
    print_schedule_table(&loan.schedule)?;

    let mut out = io::stdout().lock();
    if loan.payments.is_empty() {
        writeln!(out, "{}", "No payments yet.".dimmed())?;
        return Ok(());
    }
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);
    for payment in &loan.payments {
        _ = table.add_row(vec![Cell::new(payment.date), Cell::new(money(payment.amount))]);
    }
    writeln!(out)?;
    writeln!(
        out,
        "{} {}",
        "Payments".green().bold(),
        format_args!("({})", loan.payments.len()).dimmed()
    )?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints an amortization schedule.
fn print_schedule_table(rows: &[Installment]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "{}", "No schedule.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Interest").fg(Color::Cyan),
        Cell::new("Principal").fg(Color::Cyan),
        Cell::new("Balance").fg(Color::Cyan),
    ]);
    for row in rows {
        _ = table.add_row(vec![
            Cell::new(row.idx),
            Cell::new(row.date),
            Cell::new(money(row.amount)),
            Cell::new(money(row.interest)).fg(Color::DarkGrey),
            Cell::new(money(row.principal)),
            Cell::new(money(row.balance)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Schedule".green().bold(),
        format_args!("({} installments)", rows.len()).dimmed()
    )?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints the loan summary.
fn print_summary(summary: &LoanSummary) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Metric").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);
    let rows = [
        ("Active loans", summary.active.to_string()),
        ("Completed loans", summary.completed.to_string()),
        ("Total borrowed (active)", money(summary.total_active)),
        ("Total paid (active)", money(summary.total_paid)),
        ("Total remaining", money(summary.total_remaining)),
    ];
    for (name, value) in rows {
        _ = table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    writeln!(out, "{}", "Summary".green().bold())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints transactions in a table.
fn print_transactions_table(txs: &[Transaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Member").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);

    for tx in txs {
        let amount_cell = match tx.kind {
            TransactionType::Income => Cell::new(money(tx.amount)).fg(Color::Green),
            TransactionType::Expense => Cell::new(money(tx.amount)).fg(Color::Red),
        };
        _ = table.add_row(vec![
            Cell::new(tx.date),
            Cell::new(&tx.category),
            Cell::new(&tx.description),
            Cell::new(tx.member.as_deref().unwrap_or(EMPTY)),
            amount_cell,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", txs.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // stderr itself may be gone at this point.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use loanbook::storage::InMemoryStorage;
    use rust_decimal_macros::dec;

    fn manager() -> LoanManagerBlocking<InMemoryStorage> {
        LoanManagerBlocking::builder()
            .storage(InMemoryStorage::new())
            .notifier(loanbook::notify::NoopNotifier)
            .build()
            .unwrap()
    }

    fn no_filters() -> TransactionArgs {
        TransactionArgs {
            from: None,
            to: None,
            kind: None,
            category: None,
            member: None,
            loan: None,
            description: None,
            min_amount: None,
            max_amount: None,
        }
    }

    fn terms() -> TermsArgs {
        TermsArgs {
            amount: dec!(1200),
            installments: Some(12),
            rate: None,
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            first_date: None,
            installment_amount: None,
            first_amount: None,
            last_amount: None,
        }
    }

    // ── parsing ───────────────────────────────────────────────────────

    #[test]
    fn parse_date_valid() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("01-15-2024").is_err());
    }

    #[test]
    fn parse_decimal_accepts_plain_amounts() {
        assert_eq!(parse_decimal("860.66").unwrap(), dec!(860.66));
        assert_eq!(parse_decimal(" 100 ").unwrap(), dec!(100));
        assert!(parse_decimal("ten").is_err());
    }

    #[test]
    fn cli_parses_pay_command() {
        let cli = Cli::try_parse_from([
            "loanbook", "pay", "l-1", "100.50", "--date", "2024-02-01", "--member", "Ana",
        ])
        .unwrap();
        let Command::Pay {
            id,
            amount,
            date,
            member,
        } = cli.command
        else {
            panic!("expected pay command");
        };
        assert_eq!(id, "l-1");
        assert_eq!(amount, dec!(100.50));
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(member.as_deref(), Some("Ana"));
    }

    // ── storage location ──────────────────────────────────────────────

    #[test]
    fn data_dir_prefers_flag_then_env() {
        let flag = resolve_data_dir(Some(PathBuf::from("/a")), Some("/b".to_owned())).unwrap();
        assert_eq!(flag, PathBuf::from("/a"));
        let env = resolve_data_dir(None, Some("/b".to_owned())).unwrap();
        assert_eq!(env, PathBuf::from("/b"));
    }

    #[test]
    fn storage_opens_in_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_data_dir(Some(dir.path().to_path_buf()), None).unwrap();
        assert!(FileStorage::new(path).is_ok());
    }

    // ── filters and settings ──────────────────────────────────────────

    #[test]
    fn build_filter_no_args() {
        assert_eq!(build_transaction_filter(&no_filters()), TransactionFilter::new());
    }

    #[test]
    fn build_filter_with_everything() {
        let args = TransactionArgs {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: None,
            kind: Some(KindArg::Expense),
            category: Some("Préstamos".to_owned()),
            member: Some("Ana".to_owned()),
            loan: Some("l-1".to_owned()),
            description: Some("cuota".to_owned()),
            min_amount: Some(dec!(10)),
            max_amount: None,
        };
        let filter = build_transaction_filter(&args);
        assert!(filter.date_from.is_some());
        assert!(filter.date_to.is_none());
        assert_eq!(filter.kind, Some(TransactionType::Expense));
        assert_eq!(filter.loan, Some(LoanId::from("l-1")));
        assert_eq!(filter.min_amount, Some(dec!(10)));
        assert!(filter.max_amount.is_none());
    }

    #[test]
    fn default_member_reads_setting() {
        let manager = manager();
        assert_eq!(default_member(manager.storage()).unwrap(), None);
        assert_eq!(
            cmd_config(
                manager.storage(),
                ConfigCommand::Set {
                    key: DEFAULT_MEMBER.to_owned(),
                    value: "Ana".to_owned(),
                },
            )
            .unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(
            default_member(manager.storage()).unwrap().as_deref(),
            Some("Ana")
        );
    }

    #[test]
    fn pay_applies_default_member() {
        let manager = manager();
        manager
            .storage()
            .put(&Setting::new(DEFAULT_MEMBER.to_owned(), "Luis".into()))
            .unwrap();
        let id = manager.add(loan_from_terms("Car".to_owned(), &terms())).unwrap();
        let code = cmd_pay(&manager, &id, dec!(100), NaiveDate::from_ymd_opt(2024, 2, 1), None)
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let txs = manager.ledger().for_loan(&id).unwrap();
        assert_eq!(txs.first().unwrap().member.as_deref(), Some("Luis"));
    }

    #[test]
    fn loan_from_terms_carries_overrides() {
        let mut args = terms();
        args.first_amount = Some(dec!(150));
        let loan = loan_from_terms("Car".to_owned(), &args);
        assert_eq!(loan.installments, Some(12));
        assert_eq!(loan.first_installment_amount, Some(dec!(150)));
        assert_eq!(loan.installment_amount, Some(dec!(100)));
    }

    #[test]
    fn loan_from_terms_stores_level_payment() {
        let mut args = terms();
        args.amount = dec!(10000);
        args.rate = Some(dec!(6));
        let loan = loan_from_terms("Car".to_owned(), &args);
        assert_eq!(loan.installment_amount, Some(dec!(860.66)));
        args.installment_amount = Some(dec!(900));
        let explicit = loan_from_terms("Car".to_owned(), &args);
        assert_eq!(explicit.installment_amount, Some(dec!(900)));
    }

    // ── output ────────────────────────────────────────────────────────

    #[test]
    fn print_tables_handle_empty_input() {
        assert!(print_loans_table(&[]).is_ok());
        assert!(print_transactions_table(&[]).is_ok());
        assert!(print_schedule_table(&[]).is_ok());
    }

    #[test]
    fn print_loan_detail_with_schedule() {
        let manager = manager();
        let id = manager.add(loan_from_terms("Car".to_owned(), &terms())).unwrap();
        let loan = manager.get(&id).unwrap().unwrap();
        assert!(print_loan_detail(&loan).is_ok());
        assert!(print_summary(&manager.summary().unwrap()).is_ok());
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(dec!(5)), "5.00");
        assert_eq!(money(dec!(860.664)), "860.66");
    }
}
