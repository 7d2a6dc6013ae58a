use serde_json::{Map, Value as Json};

/// Column-oriented result of [`crate::FeatureStore::get_online_features`].
///
/// Entity columns come first, in the order their keys appear in the entity rows, followed by
/// one `"view:feature"` column per requested reference. Every column has one cell per entity
/// row; features without a stored value are `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineResponse {
    columns: Vec<(String, Vec<Json>)>,
}

impl OnlineResponse {
    pub(crate) fn from_entity_rows(rows: &[Map<String, Json>]) -> Self {
        let mut names: Vec<&String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| (name.clone(), rows.iter().map(|row| row.get(name).cloned().unwrap_or(Json::Null)).collect()))
            .collect();
        Self { columns }
    }

    pub(crate) fn push_column(&mut self, name: String, cells: Vec<Json>) {
        self.columns.push((name, cells));
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Json]> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, cells)| cells.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Column name to list of cells.
    #[must_use]
    pub fn to_dict(&self) -> Map<String, Json> {
        self.columns.iter().map(|(name, cells)| (name.clone(), Json::Array(cells.clone()))).collect()
    }

    /// One JSON object per entity row.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Map<String, Json>> {
        let len = self.columns.first().map_or(0, |(_, cells)| cells.len());
        (0..len)
            .map(|i| {
                self.columns
                    .iter()
                    .map(|(name, cells)| (name.clone(), cells.get(i).cloned().unwrap_or(Json::Null)))
                    .collect()
            })
            .collect()
    }
}
