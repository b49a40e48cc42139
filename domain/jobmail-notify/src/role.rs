use crate::{NotifyError, NotifyResult};

/// Set by distributed launchers (e.g. `torch.distributed`) for each worker process.
pub const RANK_ENV_VAR: &str = "RANK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessRole {
    /// No rank present, the only process of the run.
    Single,
    Ranked { rank: i64, raw: String },
}

impl ProcessRole {
    pub fn from_rank(raw: Option<&str>) -> NotifyResult<Self> {
        let Some(raw) = raw else {
            return Ok(ProcessRole::Single);
        };
        let rank = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| NotifyError::InvalidRank(raw.to_string()))?;
        Ok(ProcessRole::Ranked {
            rank,
            raw: raw.to_string(),
        })
    }

    pub fn is_master(&self) -> bool {
        match self {
            ProcessRole::Single => true,
            ProcessRole::Ranked { rank, .. } => *rank == 0,
        }
    }

    pub fn annotate_host(&self, host: &str) -> String {
        match self {
            ProcessRole::Single => host.to_string(),
            ProcessRole::Ranked { raw, .. } => format!("{} - RANK: {}", host, raw),
        }
    }
}

pub(crate) fn read_rank_env() -> Option<String> {
    std::env::var_os(RANK_ENV_VAR).map(|value| value.to_string_lossy().into_owned())
}
