use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::cli::utils::{output_data, output_lines};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::crud::{
    ColumnSchema, ListRequest, NormalizeOptions, Normalizer, QueryEmitter, SearchParams, SearchQueryEmitter,
    SqlWhereEmitter,
};

#[derive(Args, Debug, Clone)]
pub struct ListInput {
    #[arg(long, short, help = "Column schema file (.json, .yaml or .yml)")]
    pub columns: PathBuf,

    #[arg(long, short, help = "Listing request JSON file; read from stdin when omitted")]
    pub request: Option<PathBuf>,

    #[arg(long, help = "Fail on unparseable filter values and unsupported filters")]
    pub strict: bool,
}

impl ListInput {
    fn is_strict(&self) -> bool {
        self.strict || config().list.strict_values
    }

    fn schema(&self) -> anyhow::Result<ColumnSchema> {
        let raw = std::fs::read_to_string(&self.columns)
            .with_context(|| format!("failed to read column schema {}", self.columns.display()))?;

        let schema = match self.columns.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ColumnSchema::from_yaml(&raw),
            _ => ColumnSchema::from_json(&raw),
        };
        schema.with_context(|| format!("invalid column schema {}", self.columns.display()))
    }

    fn request(&self) -> anyhow::Result<ListRequest> {
        let raw = match &self.request {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read request {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("failed to read request from stdin")?;
                buf
            }
        };
        serde_json::from_str(&raw).context("invalid listing request JSON")
    }

    fn params(&self) -> anyhow::Result<SearchParams> {
        let schema = self.schema()?;
        let request = self.request()?;
        let normalizer = Normalizer::new(&schema).with_options(NormalizeOptions::from_config(&config().list));

        if self.is_strict() {
            Ok(normalizer.try_normalize(&request)?)
        } else {
            Ok(normalizer.normalize(&request))
        }
    }
}

pub fn extract(input: ListInput, output_format: OutputFormat) -> anyhow::Result<()> {
    let params = input.params()?;

    match output_format {
        OutputFormat::Json => output_data(&params),
        OutputFormat::Text => {
            let mut lines = vec![format!("page {} (page size {})", params.page, params.page_size)];
            for (field, shape) in params.shapes() {
                lines.push(format!("  {} [{}]", field, shape));
            }
            if let Some(sort) = &params.sort {
                lines.push(format!("  sort {} {}", sort.field, if sort.ascending { "asc" } else { "desc" }));
            }
            output_lines(&lines);
            Ok(())
        }
    }
}

pub fn search(input: ListInput, output_format: OutputFormat) -> anyhow::Result<()> {
    let params = input.params()?;
    let query = if input.is_strict() {
        SearchQueryEmitter.try_emit(&params)?
    } else {
        SearchQueryEmitter.emit(&params)
    };

    match output_format {
        OutputFormat::Json => output_data(&json!({
            "query": query.query(),
            "sort": query.sort_by(),
            "page": params.page,
            "page_size": params.page_size,
        })),
        OutputFormat::Text => {
            output_lines(&[query.to_string()]);
            Ok(())
        }
    }
}

pub fn sql(input: ListInput, table: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let params = input.params()?;
    let where_ = if input.is_strict() {
        SqlWhereEmitter.try_emit(&params)?
    } else {
        SqlWhereEmitter.emit(&params)
    };

    let (query, bound) = match table {
        Some(table) => {
            let select = where_.select_sql(&table, &params)?;
            (select.query, select.params)
        }
        None => (where_.clause, where_.params),
    };

    match output_format {
        OutputFormat::Json => output_data(&json!({ "query": query, "params": bound })),
        OutputFormat::Text => {
            let mut lines = vec![query];
            for (idx, value) in bound.iter().enumerate() {
                lines.push(format!("  ${} = {}", idx + 1, value));
            }
            output_lines(&lines);
            Ok(())
        }
    }
}
