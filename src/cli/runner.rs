//! CLI runner - executes commands

use crate::catalog::open_catalog;
use crate::cli::commands::{Cli, Commands, JobArgs, OutputFormat};
use crate::config::{JobConfig, JobOverrides};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::mapping::MappingTable;
use serde::Serialize;
use serde_json::json;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run(args) => self.run_job(args).await,
            Commands::Check(args) => self.check(args).await,
            Commands::Mapping {
                mapping,
                missing_field_policy,
            } => self.mapping(JobOverrides {
                mapping: mapping.clone(),
                missing_field_policy: *missing_field_policy,
                ..JobOverrides::default()
            }),
            Commands::Tables { database } => self.tables(database.clone()).await,
        }
    }

    /// Job name for error reporting, falling back to the default
    pub fn job_name(&self) -> String {
        let from_args = match &self.cli.command {
            Commands::Run(args) | Commands::Check(args) => args.job_name.clone(),
            _ => None,
        };
        from_args
            .or_else(|| self.base_config().ok().map(|c| c.job_name))
            .unwrap_or_else(|| JobConfig::default().job_name)
    }

    /// Config file contents, or defaults when no file was given
    fn base_config(&self) -> Result<JobConfig> {
        match &self.cli.config {
            Some(path) => JobConfig::from_file(path),
            None => Ok(JobConfig::default()),
        }
    }

    fn load_config(&self, overrides: JobOverrides) -> Result<JobConfig> {
        let mut overrides = overrides;
        if overrides.catalog.is_none() {
            overrides.catalog = self.cli.catalog.clone();
        }
        Ok(self.base_config()?.with_overrides(overrides))
    }

    fn build_job(&self, args: &JobArgs) -> Result<Job> {
        let params = self
            .load_config(args.overrides(self.cli.catalog.clone()))?
            .resolve()?;
        Job::new(params)
    }

    /// Run the job
    async fn run_job(&self, args: &JobArgs) -> Result<()> {
        let mut job = self.build_job(args)?;
        let summary = job.run().await?;
        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": summary,
        }))
    }

    /// Extract and map without writing
    async fn check(&self, args: &JobArgs) -> Result<()> {
        let job = self.build_job(args)?;
        let report = job.check().await?;
        self.output_message(&json!({
            "type": "CHECK",
            "check": report,
        }))
    }

    /// Print the mapping table
    fn mapping(&self, overrides: JobOverrides) -> Result<()> {
        let config = self.load_config(overrides)?;
        let table: MappingTable = config.mapping_table()?;
        let schema = table.output_schema(config.missing_field_policy);

        let entries: Vec<_> = table
            .entries()
            .iter()
            .zip(schema.fields())
            .map(|(m, f)| {
                json!({
                    "mapping": m.to_string(),
                    "source": m.source,
                    "target": m.target,
                    "arrow_type": f.data_type().to_string(),
                    "nullable": f.is_nullable(),
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "MAPPING",
            "missing_field_policy": config.missing_field_policy,
            "fields": entries,
        }))
    }

    /// List tables of a catalog database
    async fn tables(&self, database: Option<String>) -> Result<()> {
        let config = self.load_config(JobOverrides {
            database,
            ..JobOverrides::default()
        })?;
        let database = config
            .database
            .clone()
            .ok_or_else(|| Error::missing_parameter("database"))?;

        let catalog = open_catalog(config.catalog_path()?)?;
        let tables = catalog.list_tables(&database).await?;

        self.output_message(&json!({
            "type": "TABLES",
            "catalog": catalog.name(),
            "database": database,
            "tables": tables,
        }))
    }

    /// Output a message in the configured format
    fn output_message<T: Serialize>(&self, msg: &T) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        println!("{text}");
        Ok(())
    }
}
