//! `ddlkit diff` command - Diff two schema or snapshot files.

use ddlkit_migrate::{diff, generator_for};

use crate::cli::{DiffArgs, DiffFormat};
use crate::commands::{load_ddl, resolver};
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the diff command. Output goes to stdout undecorated so it can be
/// piped.
pub async fn run(args: DiffArgs) -> CliResult<()> {
    let (from_dialect, from) = load_ddl(&args.from).await?;
    let (to_dialect, to) = load_ddl(&args.to).await?;
    if from_dialect != to_dialect {
        return Err(CliError::Schema(format!(
            "cannot diff {} against {}",
            from_dialect, to_dialect
        )));
    }

    let resolver = resolver(args.renames.as_deref(), args.rename_mode).await?;
    let result = diff(&from, &to, to_dialect, resolver.as_ref()).await?;
    if !result.errors.is_empty() {
        output::diff_errors(&result.errors);
        return Err(CliError::Schema(format!(
            "{} structural error(s)",
            result.errors.len()
        )));
    }

    match args.format {
        DiffFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.statements)?);
        }
        DiffFormat::Sql => {
            let sql = generator_for(to_dialect).generate(&result.statements)?;
            print!("{}", sql.to_script(false));
        }
    }
    Ok(())
}
