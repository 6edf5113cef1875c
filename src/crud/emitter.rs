use super::error::FilterError;
use super::types::{FilterShape, SearchParams};

/// Backend that turns [`SearchParams`] into its own query form.
///
/// `capabilities` lists the filter shapes the backend translates. `emit` skips
/// anything else, `try_emit` refuses it.
pub trait QueryEmitter {
    type Output;

    const BACKEND: &'static str;

    fn capabilities(&self) -> &'static [FilterShape];

    fn emit(&self, params: &SearchParams) -> Self::Output;

    fn supports(&self, shape: FilterShape) -> bool {
        self.capabilities().contains(&shape)
    }

    /// Filters in `params` this backend would skip
    fn unsupported<'p>(&self, params: &'p SearchParams) -> Vec<(&'p str, FilterShape)> {
        params
            .shapes()
            .into_iter()
            .filter(|(_, shape)| !self.supports(*shape))
            .collect()
    }

    fn try_emit(&self, params: &SearchParams) -> Result<Self::Output, FilterError> {
        if let Some((field, shape)) = self.unsupported(params).into_iter().next() {
            return Err(FilterError::UnsupportedShape {
                backend: Self::BACKEND,
                field: field.to_string(),
                shape,
            });
        }
        Ok(self.emit(params))
    }
}
