use serde::Deserialize;

use crate::auth::AuthSession;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::settings::{Described, ForecastModel, Mode, PrecipitationSource};

/// One `{id, descricao}` item of a reference list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub descricao: String,
}

// Some lists send numeric ids.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

/// Id of the first entry whose `descricao` equals `name`.
pub fn find_id<'a>(entries: &'a [ReferenceEntry], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.descricao == name)
        .map(|e| e.id.as_str())
}

impl Client {
    /// Fetches the reference list at `endpoint` and returns the id named `name`.
    pub fn resolve_id(
        &self,
        session: &mut AuthSession,
        name: &str,
        endpoint: &str,
    ) -> Result<String> {
        let entries: Vec<ReferenceEntry> = self
            .get_json_as(session, endpoint)?
            .unwrap_or_default();

        find_id(&entries, name)
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            })
    }

    /// Resolves any value of a closed enumeration against its reference list.
    pub fn id_of<T: Described>(&self, session: &mut AuthSession, value: T) -> Result<String> {
        self.resolve_id(session, value.descricao(), T::ENDPOINT)
    }

    pub fn mode_id(&self, session: &mut AuthSession, mode: Mode) -> Result<String> {
        self.id_of(session, mode)
    }

    pub fn precipitation_source_id(
        &self,
        session: &mut AuthSession,
        source: PrecipitationSource,
    ) -> Result<String> {
        self.id_of(session, source)
    }

    pub fn forecast_model_id(
        &self,
        session: &mut AuthSession,
        model: ForecastModel,
    ) -> Result<String> {
        self.id_of(session, model)
    }
}
