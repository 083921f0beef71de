//! Taxonomy dump model, reader/writer, and training-subtree pruning.
//!
//! The dump format follows NCBI conventions: `nodes.dmp` rows of
//! `taxid | parent | rank |`, `names.dmp` rows carrying scientific names,
//! and a `taxid.map` of `processid<TAB>taxid` pairs.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{BarcodekitError, Result};

/// Bound on ancestor-chain walks, guarding against cycles in malformed
/// dumps.
const MAX_ANCESTOR_HOPS: usize = 128;

/// One taxonomy node. A parent of 0 (or the node itself) marks a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxNode {
    pub taxid: i64,
    pub parent: i64,
    pub rank: String,
    pub name: String,
}

/// An id-indexed taxonomy tree loaded from dump files.
#[derive(Debug, Default)]
pub struct TaxDump {
    nodes: HashMap<i64, TaxNode>,
}

impl TaxDump {
    /// Load `nodes.dmp` and `names.dmp` from a dump directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut dump = Self::default();
        dump.load_nodes(&dir.join("nodes.dmp"))?;
        dump.load_names(&dir.join("names.dmp"))?;
        Ok(dump)
    }

    fn load_nodes(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|e| BarcodekitError::io(path, e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| BarcodekitError::io(path, e))?;
            let parts: Vec<&str> = line.split("\t|\t").collect();
            if parts.len() < 3 {
                continue;
            }
            let Ok(taxid) = parts[0].trim().parse::<i64>() else {
                continue;
            };
            let parent = parts[1].trim().parse::<i64>().unwrap_or(0);
            let rank = parts[2].trim_end_matches("\t|").trim().to_string();
            self.nodes.insert(
                taxid,
                TaxNode {
                    taxid,
                    parent,
                    rank,
                    name: String::new(),
                },
            );
        }
        Ok(())
    }

    fn load_names(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|e| BarcodekitError::io(path, e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| BarcodekitError::io(path, e))?;
            let parts: Vec<&str> = line.split("\t|\t").collect();
            if parts.len() < 4 {
                continue;
            }
            let Ok(taxid) = parts[0].trim().parse::<i64>() else {
                continue;
            };
            let name_class = parts[3].trim_end_matches("\t|").trim();
            if name_class != "scientific name" {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&taxid) {
                node.name = parts[1].trim().to_string();
            }
        }
        Ok(())
    }

    /// Look up a node by taxid.
    pub fn get(&self, taxid: i64) -> Option<&TaxNode> {
        self.nodes.get(&taxid)
    }

    /// Number of loaded nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the dump holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ancestor closure: every given taxid plus its full parent chain.
    ///
    /// Walks are bounded to [`MAX_ANCESTOR_HOPS`] and stop early on an
    /// already-kept id, a missing node, a self-parent, or a non-positive
    /// parent.
    pub fn ancestor_closure<'a, I>(&self, taxids: I) -> HashSet<i64>
    where
        I: IntoIterator<Item = &'a i64>,
    {
        let mut keep = HashSet::new();
        for &taxid in taxids {
            let mut cur = taxid;
            for _ in 0..MAX_ANCESTOR_HOPS {
                if cur <= 0 || !keep.insert(cur) {
                    break;
                }
                let Some(node) = self.nodes.get(&cur) else {
                    break;
                };
                if node.parent == cur || node.parent <= 0 {
                    break;
                }
                cur = node.parent;
            }
        }
        keep
    }
}

/// Load a `taxid.map` of `processid<TAB>taxid` pairs.
pub fn load_taxid_map(path: &Path) -> Result<HashMap<String, i64>> {
    let file = File::open(path).map_err(|e| BarcodekitError::io(path, e))?;
    let mut map = HashMap::new();
    let mut line_no: u64 = 0;
    for line in BufReader::new(file).lines() {
        line_no += 1;
        let line = line.map_err(|e| BarcodekitError::io(path, e))?;
        if line.is_empty() {
            continue;
        }
        let Some((pid, taxid)) = line.split_once('\t') else {
            return Err(BarcodekitError::Row {
                path: path.to_path_buf(),
                line: line_no,
                message: "expected processid<TAB>taxid".to_string(),
            });
        };
        let taxid = taxid.trim().parse::<i64>().map_err(|_| BarcodekitError::Row {
            path: path.to_path_buf(),
            line: line_no,
            message: format!("invalid taxid {taxid:?}"),
        })?;
        map.insert(pid.to_string(), taxid);
    }
    Ok(map)
}

/// Result of pruning a taxdump to the training subtree.
#[derive(Debug)]
pub struct PruneOutcome {
    /// Directory holding the pruned nodes.dmp/names.dmp/taxid.map.
    pub dir: PathBuf,
    /// Number of kept taxonomy nodes.
    pub kept: usize,
}

/// Prune the taxdump to the subtree reachable from `seen_train` records.
///
/// Every train-bucket process id must appear in the id map; an absent id is
/// a hard integrity error. Writes the pruned dump under
/// `<out_dir>/taxdump_pruned`.
pub fn prune_for_train(
    train_ids: &HashSet<String>,
    taxdump_dir: &Path,
    taxid_map: Option<&Path>,
    out_dir: &Path,
) -> Result<PruneOutcome> {
    if train_ids.is_empty() {
        return Err(BarcodekitError::Integrity(
            "no seen_train sequences found; cannot prune taxdump".to_string(),
        ));
    }

    let default_map = taxdump_dir.join("taxid.map");
    let map_path = taxid_map.unwrap_or(&default_map);
    let pid_to_taxid = load_taxid_map(map_path)?;
    let dump = TaxDump::load(taxdump_dir)?;

    let mut train_taxids: HashMap<&str, i64> = HashMap::with_capacity(train_ids.len());
    for pid in train_ids {
        let Some(&taxid) = pid_to_taxid.get(pid) else {
            return Err(BarcodekitError::Integrity(format!(
                "taxid not found for seen_train processid {pid}"
            )));
        };
        train_taxids.insert(pid, taxid);
    }

    let keep = dump.ancestor_closure(train_taxids.values());

    let pruned_dir = out_dir.join("taxdump_pruned");
    fs::create_dir_all(&pruned_dir).map_err(|e| BarcodekitError::io(&pruned_dir, e))?;
    write_pruned_nodes(&pruned_dir.join("nodes.dmp"), &dump, &keep)?;
    write_pruned_names(&pruned_dir.join("names.dmp"), &dump, &keep)?;
    write_pruned_taxid_map(&pruned_dir.join("taxid.map"), &train_taxids)?;

    Ok(PruneOutcome {
        dir: pruned_dir,
        kept: keep.len(),
    })
}

fn sorted_ids(keep: &HashSet<i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = keep.iter().copied().collect();
    ids.sort_unstable();
    ids
}

fn write_pruned_nodes(path: &Path, dump: &TaxDump, keep: &HashSet<i64>) -> Result<()> {
    let file = File::create(path).map_err(|e| BarcodekitError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for id in sorted_ids(keep) {
        let Some(node) = dump.get(id) else { continue };
        writeln!(w, "{id}\t|\t{}\t|\t{}\t|", node.parent, node.rank)
            .map_err(|e| BarcodekitError::io(path, e))?;
    }
    w.flush().map_err(|e| BarcodekitError::io(path, e))
}

fn write_pruned_names(path: &Path, dump: &TaxDump, keep: &HashSet<i64>) -> Result<()> {
    let file = File::create(path).map_err(|e| BarcodekitError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for id in sorted_ids(keep) {
        let Some(node) = dump.get(id) else { continue };
        if node.name.is_empty() {
            continue;
        }
        writeln!(w, "{id}\t|\t{}\t|\t\t|\tscientific name\t|", node.name)
            .map_err(|e| BarcodekitError::io(path, e))?;
    }
    w.flush().map_err(|e| BarcodekitError::io(path, e))
}

fn write_pruned_taxid_map(path: &Path, train_taxids: &HashMap<&str, i64>) -> Result<()> {
    let mut pids: Vec<&str> = train_taxids.keys().copied().collect();
    pids.sort_unstable();

    let file = File::create(path).map_err(|e| BarcodekitError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for pid in pids {
        writeln!(w, "{pid}\t{}", train_taxids[pid]).map_err(|e| BarcodekitError::io(path, e))?;
    }
    w.flush().map_err(|e| BarcodekitError::io(path, e))
}
