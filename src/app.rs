//! Search page state: one update function per user action.
//!
//! Failures never escape as panics or silent drops; each action that fails
//! queues a destructive [`Notice`] and rolls back what it changed.

use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::{Result, SchoolMatchError};
use crate::models::{LatLng, PlacePrediction, SelectedPlace};
use crate::notice::{ConfigErrorPanel, Notice};
use crate::parameters::{
    ActiveParameterSet, Catalog, ParamValue, ParameterValues, Widget, render_widgets,
};
use crate::query::{build_payload, build_query_string, build_report_payload};
use crate::ranking::{ChatRoute, RankedSchool, select_school};

const NO_PLACE_MESSAGE: &str = "Please select a valid address first.";

pub struct SearchPage {
    catalog: Catalog,
    values: ParameterValues,
    active: ActiveParameterSet,
    selected_place: SelectedPlace,
    k: u32,
    position: Option<LatLng>,
    ranking: Vec<RankedSchool>,
    query_string: String,
    loading: bool,
    notices: Vec<Notice>,
}

impl SearchPage {
    /// Fails with the configuration panel when no public maps key is set.
    pub fn new(config: &Config, catalog: Catalog) -> std::result::Result<Self, ConfigErrorPanel> {
        if let Err(e) = config.public_maps_key() {
            let message = match e {
                SchoolMatchError::Config(msg) => msg,
                other => other.to_string(),
            };
            return Err(ConfigErrorPanel::new(message));
        }
        Ok(Self {
            values: ParameterValues::defaults(&catalog),
            catalog,
            active: ActiveParameterSet::new(),
            selected_place: None,
            k: config.ranking.default_k,
            position: None,
            ranking: Vec::new(),
            query_string: String::new(),
            loading: false,
            notices: Vec::new(),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_place(&self) -> Option<&PlacePrediction> {
        self.selected_place.as_ref()
    }

    pub fn position(&self) -> Option<LatLng> {
        self.position
    }

    pub fn ranking(&self) -> &[RankedSchool] {
        &self.ranking
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_confirm(&self) -> bool {
        !self.loading && self.selected_place.is_some()
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Parent side of the address input callback.
    pub fn select_place(&mut self, place: SelectedPlace) {
        if let Some(ref p) = place {
            self.notices.push(Notice::info(
                "Address Selected",
                format!("Selected: {}", p.description),
            ));
        }
        self.selected_place = place;
    }

    pub fn toggle_parameter(&mut self, id: &str) -> Result<bool> {
        self.active.toggle(&self.catalog, id)
    }

    pub fn set_value(&mut self, id: &str, value: ParamValue) -> Result<()> {
        self.values.set(&self.catalog, id, value)
    }

    /// Activate a parameter from an `id=value` pair and set its value.
    pub fn apply_filter(&mut self, pair: &str) -> Result<()> {
        let (id, raw) = pair
            .split_once('=')
            .ok_or_else(|| SchoolMatchError::invalid_parameter(pair, "expected id=value"))?;
        let kind = self
            .catalog
            .get(id)
            .map(|p| p.kind)
            .ok_or_else(|| SchoolMatchError::invalid_parameter(id, "not in catalog"))?;
        let value = kind.parse_value(raw).ok_or_else(|| {
            SchoolMatchError::invalid_parameter(
                id,
                format!("cannot read {:?} as {}", raw, kind.as_str()),
            )
        })?;
        self.values.set(&self.catalog, id, value)?;
        if !self.active.contains(id) {
            self.active.toggle(&self.catalog, id)?;
        }
        Ok(())
    }

    pub fn set_k(&mut self, k: u32) {
        self.k = k;
    }

    pub fn widgets(&self) -> Vec<Widget> {
        render_widgets(&self.catalog, &self.active, &self.values)
    }

    pub fn parameter_menu_label(&self) -> String {
        format!("Select Parameters({} selected)", self.active.len())
    }

    fn require_place(&mut self) -> Result<String> {
        match self.selected_place.as_ref().map(|p| p.place_id.clone()) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => {
                self.notices.push(Notice::error(NO_PLACE_MESSAGE));
                Err(SchoolMatchError::MissingInput(NO_PLACE_MESSAGE.to_string()))
            }
        }
    }

    /// Send the filters to `/report` and show the returned location.
    pub async fn confirm(&mut self, client: &BackendClient) -> Result<LatLng> {
        let place_id = self.require_place()?;
        self.position = None;

        let payload = build_report_payload(&self.catalog, &self.active, &self.values, &place_id);
        let result = {
            let _loading = Loading::start(&mut self.loading);
            client.report(payload).await
        };

        match result {
            Ok(location) => {
                self.position = Some(location);
                self.notices.push(Notice::info(
                    "Location Confirmed",
                    "Displaying map for the selected location.",
                ));
                Ok(location)
            }
            Err(e) => {
                self.notices.push(Notice::from(&e));
                Err(e)
            }
        }
    }

    /// Request the ranking for the selected place and current filters.
    pub async fn find_schools(&mut self, client: &BackendClient) -> Result<&[RankedSchool]> {
        let place_id = self.require_place()?;
        self.ranking.clear();

        let payload = build_payload(&self.catalog, &self.active, &self.values, &place_id, self.k);
        let result = {
            let _loading = Loading::start(&mut self.loading);
            client.get_ranking(payload).await
        };

        match result {
            Ok(resp) => {
                if let Some(location) = resp.location {
                    self.position = Some(location);
                }
                self.ranking = resp.ranked();
                self.query_string = build_query_string(
                    &self.catalog,
                    &self.active,
                    &self.values,
                    &[("place_id", place_id), ("k", self.k.to_string())],
                );
                tracing::info!(schools = self.ranking.len(), "ranking received");
                Ok(&self.ranking)
            }
            Err(e) => {
                self.notices.push(Notice::from(&e));
                Err(e)
            }
        }
    }

    /// Route to the chat page for the school at `rank`.
    pub fn open_school(&self, rank: u32) -> Option<ChatRoute> {
        self.ranking
            .iter()
            .find(|s| s.rank == rank)
            .map(|school| select_school(school, &self.query_string))
    }
}

/// Sets the page's loading flag for one request and clears it on drop, so an
/// abandoned request does not leave the page stuck.
struct Loading<'a>(&'a mut bool);

impl<'a> Loading<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
