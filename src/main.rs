//! Command-line front end: `analyze` a case or `ask` the history.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use ppci_review::config::AppConfig;
use ppci_review::models::{CaseFields, ACTION_STATUS_PLACEHOLDER};
use ppci_review::pipeline::extraction::DocumentBlob;
use ppci_review::service::{AnalysisOutcome, Notice, NoticeLevel, ReviewService};
use ppci_review::session::ReviewSession;

/// Compliance review of audit-court recommendations.
#[derive(Parser, Debug)]
#[command(name = "ppci-review", version, about, long_about = None)]
struct Cli {
    /// Print the outcome as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze the manager's action against a recommendation.
    Analyze(AnalyzeArgs),

    /// Ask the institutional history a question.
    Ask {
        /// Free-text question (decision number, recommendation or manager).
        question: String,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Case document (PDF). Repeat for several; order is preserved.
    #[arg(long = "doc", required = true)]
    docs: Vec<PathBuf>,

    #[arg(long, default_value = "")]
    analyst: String,
    #[arg(long)]
    decision_number: String,
    #[arg(long, default_value = "")]
    decision_date: String,
    #[arg(long, default_value = "")]
    process_number: String,
    #[arg(long, default_value = "")]
    ppci_number: String,
    #[arg(long, default_value = "")]
    recommendation_number: String,
    #[arg(long, default_value = "")]
    responsible_code: String,
    /// Issuing body; TCE-MT when blank.
    #[arg(long, default_value = "")]
    issuing_body: String,
    #[arg(long, default_value = "")]
    manager: String,
    #[arg(long)]
    recommendation: String,
    /// "Implementada" or "Em Implementação".
    #[arg(long, default_value = ACTION_STATUS_PLACEHOLDER)]
    status: String,
    #[arg(long, default_value = "")]
    implementation_date: String,
    #[arg(long)]
    manager_action: String,

    /// Write the single-row CSV export into this directory.
    #[arg(long)]
    csv_out: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn case_fields(&self) -> CaseFields {
        CaseFields {
            analyst: self.analyst.clone(),
            decision_number: self.decision_number.clone(),
            decision_date: self.decision_date.clone(),
            process_number: self.process_number.clone(),
            ppci_number: self.ppci_number.clone(),
            recommendation_number: self.recommendation_number.clone(),
            responsible_code: self.responsible_code.clone(),
            issuing_body: self.issuing_body.clone(),
            manager: self.manager.clone(),
            recommendation: self.recommendation.clone(),
            action_status: self.status.clone(),
            implementation_date: self.implementation_date.clone(),
            manager_action: self.manager_action.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    ppci_review::init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            eprintln!("Erro de configuração: {e}");
            return ExitCode::from(2);
        }
    };
    let service = match ReviewService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Service startup failed");
            eprintln!("Erro de configuração: {e}");
            return ExitCode::from(2);
        }
    };

    let mut session = ReviewSession::new();
    let result = match cli.command {
        Commands::Analyze(args) => run_analyze(&service, &mut session, &args, cli.json),
        Commands::Ask { question } => run_ask(&service, &mut session, &question, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(notice) => {
            print_notice(&notice);
            ExitCode::from(1)
        }
    }
}

fn run_analyze(
    service: &ReviewService,
    session: &mut ReviewSession,
    args: &AnalyzeArgs,
    json: bool,
) -> Result<(), Notice> {
    let mut documents = Vec::with_capacity(args.docs.len());
    for path in &args.docs {
        let blob = DocumentBlob::from_path(path)
            .map_err(|e| Notice::error(format!("{}: {e}", path.display())))?;
        documents.push(blob);
    }

    let outcome = service.analyze(session, &args.case_fields(), &documents)?;

    if let Some(dir) = &args.csv_out {
        let target = dir.join(&outcome.csv_file_name);
        std::fs::write(&target, &outcome.csv)
            .map_err(|e| Notice::error(format!("{}: {e}", target.display())))?;
        eprintln!("CSV salvo em {}", target.display());
    }

    if json {
        let text = serde_json::to_string_pretty(&outcome)
            .map_err(|e| Notice::error(e.to_string()))?;
        println!("{text}");
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn run_ask(
    service: &ReviewService,
    session: &mut ReviewSession,
    question: &str,
    json: bool,
) -> Result<(), Notice> {
    let answer = service.ask(session, question)?;
    if json {
        let text =
            serde_json::to_string_pretty(&answer).map_err(|e| Notice::error(e.to_string()))?;
        println!("{text}");
    } else {
        println!("{}", answer.answer);
    }
    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let record = &outcome.record;
    let analysis = &record.analysis;

    for notice in &outcome.notices {
        print_notice(notice);
    }

    println!("Decisão: {}", record.decision_number);
    println!("Status da ação: {}", record.action_status);
    println!("Classificação final: {}", analysis.classification.display_label());
    println!();
    println!("Relatório técnico:\n{}", analysis.technical_report);
    println!();
    println!("Análise contextual:\n{}", analysis.contextual_assessment);

    if !analysis.training_insights.is_empty() {
        println!();
        println!("Insights para capacitação:");
        let insights = &analysis.training_insights;
        for item in insights
            .identified_patterns
            .iter()
            .chain(&insights.prevention_suggestions)
            .chain(&insights.modus_operandi)
        {
            println!("  - {item}");
        }
    }

    println!();
    println!(
        "Dano ao erário: {}",
        if analysis.treasury_damage.indicated { "Sim" } else { "Não" }
    );
    if analysis.treasury_damage.indicated {
        println!("  {}", analysis.treasury_damage.description);
        println!("  {}", analysis.treasury_damage.legal_basis);
    }

    if outcome.parse_failure.is_some() {
        println!();
        println!("Saída bruta do modelo:\n{}", outcome.raw_reply);
    }
}

fn print_notice(notice: &Notice) {
    let prefix = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "aviso",
        NoticeLevel::Error => "erro",
    };
    eprintln!("[{prefix}] {notice}");
}
