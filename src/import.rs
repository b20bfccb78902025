//! Block import
//!
//! Converts result files organized as numbered blocks of columns into Meld.
//! Each block shares one abscissa (usually time) and exposes a list of
//! variables, several of which may read the same stored column with a
//! different sign or scale. Parsing the source format is the job of a
//! [`BlockSource`] implementation; this module only drives the writer:
//!
//! - every block becomes a table named `T<block>`
//! - the abscissa is the first signal of the table
//! - the first variable claiming a column becomes a signal, later ones
//!   become aliases of it
//! - descriptions are stored in variable metadata under [`DESC_KEY`]

use recon_core::{Error, Map, Result, Transform, Value};
use recon_format::Durable;
use recon_meld::MeldWriter;
use std::collections::BTreeMap;
use std::io::{Seek, Write};
use tracing::{debug, info};

/// Variable metadata key holding a description
pub const DESC_KEY: &str = "desc";

/// The shared independent variable of a block
#[derive(Debug, Clone, PartialEq)]
pub struct Abscissa {
    /// Signal name
    pub name: String,
    /// Human readable description
    pub description: String,
}

/// One variable of a block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockVariable {
    /// Variable name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Stored column the variable reads
    pub column: usize,
    /// Factor applied to the stored column; usually 1 or -1
    pub scale: f64,
}

/// A source of block-organized result data
pub trait BlockSource {
    /// Block names in import order
    fn blocks(&self) -> Result<Vec<String>>;

    /// Abscissa of a block
    fn abscissa(&self, block: &str) -> Result<Abscissa>;

    /// Abscissa values of a block
    fn abscissa_data(&self, block: &str) -> Result<Vec<f64>>;

    /// Variables of a block in declaration order, abscissa excluded
    fn variables(&self, block: &str) -> Result<Vec<BlockVariable>>;

    /// Raw values of one stored column, before any variable's scale
    fn column(&self, block: &str, column: usize) -> Result<Vec<f64>>;
}

/// Counts reported by [`import_blocks`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Tables created
    pub tables: usize,
    /// Signals written, abscissas included
    pub signals: usize,
    /// Aliases defined
    pub aliases: usize,
}

/// Signals of one block, each with the column it stores
struct BlockPlan {
    table: String,
    abscissa: String,
    signals: Vec<BlockVariable>,
}

/// Name of the table a block is imported into
pub fn table_name(block: &str) -> String {
    format!("T{}", block)
}

/// Transform mapping `signal` onto `alias` when both read the same column
fn relative_transform(signal: &BlockVariable, alias: &BlockVariable) -> Result<Option<Transform>> {
    if signal.scale == 0.0 {
        return Err(Error::InvalidTransform(format!(
            "signal {} has zero scale, cannot alias {}",
            signal.name, alias.name
        )));
    }
    let scale = alias.scale / signal.scale;
    Ok(if scale == 1.0 {
        None
    } else if scale == -1.0 {
        Some(Transform::Inverse)
    } else {
        Some(Transform::affine(scale, 0.0))
    })
}

fn describe(description: &str) -> Map {
    let mut md = Map::new();
    md.insert(DESC_KEY.to_string(), Value::from(description));
    md
}

/// Import every block of `source` into `meld`, then close it.
///
/// The writer must be in its definition phase.
pub fn import_blocks<S, W>(source: &S, meld: &mut MeldWriter<W>) -> Result<ImportSummary>
where
    S: BlockSource + ?Sized,
    W: Write + Seek + Durable,
{
    let mut summary = ImportSummary::default();
    let mut plans = Vec::new();

    for block in source.blocks()? {
        let abscissa = source.abscissa(&block)?;
        let table = table_name(&block);
        let mut builder = meld.add_table(&table, None)?;
        builder.add_signal_with(&abscissa.name, Some(describe(&abscissa.description)), None)?;

        let mut claimed: BTreeMap<usize, BlockVariable> = BTreeMap::new();
        let mut signals = Vec::new();
        let mut aliases = 0usize;
        for var in source.variables(&block)? {
            match claimed.get(&var.column) {
                Some(signal) => {
                    let transform = relative_transform(signal, &var)?.map(|t| t.descriptor());
                    builder.add_alias_with(
                        &var.name,
                        &signal.name,
                        transform.as_deref(),
                        Some(describe(&var.description)),
                    )?;
                    aliases += 1;
                }
                None => {
                    builder.add_signal_with(&var.name, Some(describe(&var.description)), None)?;
                    claimed.insert(var.column, var.clone());
                    signals.push(var);
                }
            }
        }

        debug!(
            target: "recon::import",
            block = %block,
            columns = claimed.len(),
            signals = signals.len(),
            aliases,
            "Planned block"
        );
        summary.tables += 1;
        summary.aliases += aliases;
        plans.push((
            block,
            BlockPlan {
                table,
                abscissa: abscissa.name,
                signals,
            },
        ));
    }

    meld.finalize()?;

    for (block, plan) in &plans {
        let abscissa = source.abscissa_data(block)?;
        meld.write_signal(&plan.table, &plan.abscissa, Value::from_iter(abscissa))?;
        summary.signals += 1;

        for var in &plan.signals {
            let values = source
                .column(block, var.column)?
                .into_iter()
                .map(|v| v * var.scale);
            meld.write_signal(&plan.table, &var.name, Value::from_iter(values))?;
            summary.signals += 1;
        }
    }

    meld.close()?;
    info!(
        target: "recon::import",
        tables = summary.tables,
        signals = summary.signals,
        aliases = summary.aliases,
        "Imported blocks"
    );
    Ok(summary)
}
