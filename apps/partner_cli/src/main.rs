use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use partner_core::{
    config::{load_settings_from, SETTINGS_FILE},
    PartnerSearch, QueryDispatcher, SearchForm, SearchSession, Settings,
};
use shared::{domain::CompanyRecord, protocol::PredictInput};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod view;

#[derive(Parser, Debug)]
#[command(name = "partner-finder", about = "Search and score partner companies")]
struct Cli {
    #[arg(long, default_value = SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    read_model_url: Option<String>,
    #[arg(long)]
    read_model_key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search partners; with no filters this lists all companies.
    Search {
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the normalized records as JSON instead of the list view.
        #[arg(long)]
        json: bool,
    },
    /// List companies without filters.
    List {
        #[arg(long)]
        limit: Option<String>,
    },
    /// Run a search and show the detail view of one result.
    Show {
        index: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Ask the scoring model for a partner score.
    Predict(PredictArgs),
    /// List the known industry sectors.
    Sectors {
        #[arg(long, default_value_t = 1000)]
        max: u32,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long, default_value = "")]
    region: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    client_name: String,
    #[arg(long, default_value = "")]
    industry: String,
    /// Enterprise, MidMarket or Territory.
    #[arg(long, default_value = "")]
    segment: String,
    #[arg(long)]
    limit: Option<String>,
}

impl FilterArgs {
    fn into_form(self, default_limit: i64) -> SearchForm {
        SearchForm {
            country: self.country,
            region: self.region,
            city: self.city,
            client_name: self.client_name,
            industry: self.industry,
            segment: self.segment,
            limit: self.limit.unwrap_or_else(|| default_limit.to_string()),
        }
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    company_id: Option<i64>,
    #[arg(long, default_value = "")]
    revenue_band: String,
    #[arg(long, default_value = "")]
    employee_band: String,
    #[arg(long, default_value = "")]
    years_in_business_band: String,
    #[arg(long, default_value = "")]
    global_region: String,
    #[arg(long, default_value = "")]
    industry_detail_customer: String,
    #[arg(long, default_value = "")]
    cloud_coverage: String,
    #[arg(long, default_value = "")]
    technology_scope: String,
    #[arg(long, default_value = "")]
    partner_classification: String,
}

impl From<PredictArgs> for PredictInput {
    fn from(args: PredictArgs) -> Self {
        Self {
            company_id: args.company_id,
            revenue_band: args.revenue_band,
            employee_band: args.employee_band,
            years_in_business_band: args.years_in_business_band,
            global_region: args.global_region,
            industry_detail_customer: args.industry_detail_customer,
            cloud_coverage: args.cloud_coverage,
            technology_scope: args.technology_scope,
            partner_classification: args.partner_classification,
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings_from(&cli.config)
        .with_context(|| format!("failed to load settings from '{}'", cli.config.display()))?;
    if let Some(v) = &cli.api_base {
        settings.api_base = v.clone();
    }
    if let Some(v) = &cli.read_model_url {
        settings.read_model_url = Some(v.clone());
    }
    if let Some(v) = &cli.read_model_key {
        settings.read_model_key = Some(v.clone());
    }
    settings.validate()?;
    Ok(settings)
}

async fn search(search: &PartnerSearch, form: &SearchForm) -> Result<SearchSession> {
    let mut session = SearchSession::default();
    let ticket = session.begin();
    let outcome = search.run(form).await;
    session.complete(ticket, outcome);
    if let Some(error) = session.error() {
        bail!("search failed: {error}");
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    let dispatcher = QueryDispatcher::from_settings(&settings)?;
    let partner_search = PartnerSearch::new(dispatcher);

    match cli.command {
        Command::Search { filters, json } => {
            let form = filters.into_form(settings.default_limit);
            let session = search(&partner_search, &form).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(session.records())?);
            } else {
                print!("{}", view::render_list(&session.companies(), session.total()));
            }
        }
        Command::List { limit } => {
            let form = FilterArgs {
                limit,
                ..FilterArgs::default()
            }
            .into_form(settings.default_limit);
            let session = search(&partner_search, &form).await?;
            print!("{}", view::render_list(&session.companies(), session.total()));
        }
        Command::Show { index, filters } => {
            let form = filters.into_form(settings.default_limit);
            let mut session = search(&partner_search, &form).await?;
            let found = session.records().len();
            let Some(record) = session.select(index) else {
                bail!("no result at index {index}; the search returned {found} record(s)");
            };
            print!("{}", view::render_detail(&CompanyRecord::from_raw(record)));
        }
        Command::Predict(args) => {
            let input = PredictInput::from(args);
            let response = partner_search.dispatcher().predict_score(&input).await?;
            print!("{}", view::render_prediction(&response));
        }
        Command::Sectors { max } => {
            let sectors = partner_search.dispatcher().industry_sectors(max).await?;
            info!(count = sectors.len(), "loaded industry sectors");
            print!("{}", view::render_sectors(&sectors));
        }
    }

    Ok(())
}
