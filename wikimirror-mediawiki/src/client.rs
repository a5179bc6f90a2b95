//! Blocking transport for the Action API.

use std::time::Duration;

use serde_json::Value;

use crate::error::MediaWikiError;
use crate::response::{check_error, continuation};

pub(crate) type Params = Vec<(String, String)>;

/// Build a parameter list from borrowed pairs.
pub(crate) fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// One HTTP agent shared by every site; its cookie store keeps per-host
/// sessions apart.
pub(crate) struct ApiClient {
    agent: ureq::Agent,
}

impl ApiClient {
    pub(crate) fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build();
        Self { agent }
    }

    /// Read-only request.
    pub(crate) fn get(&self, endpoint: &str, params: &Params) -> Result<Value, MediaWikiError> {
        let mut req = self
            .agent
            .get(endpoint)
            .query("format", "json")
            .query("formatversion", "2");
        for (k, v) in params {
            req = req.query(k, v);
        }
        tracing::trace!("GET {endpoint} {params:?}");
        let body: Value = req.call()?.into_json()?;
        check_error(&body)?;
        Ok(body)
    }

    /// State-changing request, form-encoded.
    pub(crate) fn post(&self, endpoint: &str, params: &Params) -> Result<Value, MediaWikiError> {
        let mut form: Vec<(&str, &str)> = vec![("format", "json"), ("formatversion", "2")];
        form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        tracing::trace!(
            "POST {endpoint} action={}",
            params
                .iter()
                .find(|(k, _)| k == "action")
                .map(|(_, v)| v.as_str())
                .unwrap_or("?")
        );
        let body: Value = self.agent.post(endpoint).send_form(&form)?.into_json()?;
        check_error(&body)?;
        Ok(body)
    }

    /// Run a list query to exhaustion, handing every batch to `each`.
    pub(crate) fn get_all<F>(
        &self,
        endpoint: &str,
        base: &Params,
        mut each: F,
    ) -> Result<(), MediaWikiError>
    where
        F: FnMut(Value) -> Result<(), MediaWikiError>,
    {
        let mut request = base.clone();
        loop {
            let body = self.get(endpoint, &request)?;
            let next = continuation(&body);
            each(body)?;
            match next {
                Some(cont) => {
                    request = base.clone();
                    request.extend(cont);
                }
                None => return Ok(()),
            }
        }
    }
}
