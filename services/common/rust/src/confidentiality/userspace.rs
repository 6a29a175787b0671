use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::result::Result as DefaultResult;
use std::sync::RwLock;

use serde_json::Value as JsnVal;

use super::AbstractConfidentiality;
use crate::error::{AppConfidentialityError, AppErrorCode};

const SOURCE_SIZE_LIMIT_NBYTES: u64 = 8196;

/// Secrets kept in a JSON file readable only by the service account,
/// each payload is addressed by slash-separated path e.g. `databases/inventory/HOST`
pub struct UserSpaceConfidentiality {
    src_fullpath: String,
    // few modules read secrets (database servers, message broker),
    // the cache should stay small
    cached: RwLock<HashMap<String, String>>,
}

impl UserSpaceConfidentiality {
    pub fn build(fullpath: String) -> Self {
        Self {
            cached: RwLock::new(HashMap::new()),
            src_fullpath: fullpath,
        }
    }

    fn rawdata_from_source(&self) -> DefaultResult<Vec<u8>, AppConfidentialityError> {
        let io_err = |e: std::io::Error| AppConfidentialityError {
            code: AppErrorCode::IOerror(e.kind()),
            detail: e.to_string(),
        };
        let mut file = File::open(self.src_fullpath.as_str()).map_err(io_err)?;
        let actual_f_sz = file.metadata().map_err(io_err)?.len();
        if actual_f_sz >= SOURCE_SIZE_LIMIT_NBYTES {
            return Err(AppConfidentialityError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: format!("source-file-size:{actual_f_sz}"),
            });
        }
        let mut rawbuf = Vec::new();
        let _sz = file.read_to_end(&mut rawbuf).map_err(io_err)?;
        Ok(rawbuf)
    }

    fn search_json_payload<'a>(
        toplvl: &'a JsnVal,
        id_: &str,
    ) -> DefaultResult<&'a JsnVal, AppConfidentialityError> {
        let mut curr_lvl = toplvl;
        for tok in id_.split('/') {
            let next = match curr_lvl {
                JsnVal::Object(o) => o.get(tok),
                JsnVal::Array(a) => tok.parse::<usize>().ok().and_then(|i| a.get(i)),
                _others => None,
            };
            curr_lvl = next.ok_or(AppConfidentialityError {
                code: AppErrorCode::NoConfidentialityCfg,
                detail: format!("id:{id_}, token:{tok}"),
            })?;
        }
        Ok(curr_lvl)
    }

    fn lock_error(e: impl ToString) -> AppConfidentialityError {
        AppConfidentialityError {
            code: AppErrorCode::AcquireLockFailure,
            detail: e.to_string() + ", source: UserSpaceConfidentiality",
        }
    }
} // end of impl UserSpaceConfidentiality

impl AbstractConfidentiality for UserSpaceConfidentiality {
    fn try_get_payload(&self, id_: &str) -> DefaultResult<String, AppConfidentialityError> {
        {
            let rguard = self.cached.read().map_err(Self::lock_error)?;
            if let Some(v) = rguard.get(id_) {
                return Ok(v.clone());
            }
        }
        let rawdata = self.rawdata_from_source()?;
        let toplvl = serde_json::from_slice::<JsnVal>(&rawdata).map_err(|e| {
            AppConfidentialityError {
                code: AppErrorCode::InvalidJsonFormat,
                detail: e.to_string(),
            }
        })?;
        let found = Self::search_json_payload(&toplvl, id_)?.to_string();
        let mut wguard = self.cached.write().map_err(Self::lock_error)?;
        let _old = wguard.insert(id_.to_string(), found.clone());
        Ok(found)
    } // end of fn try_get_payload
}
