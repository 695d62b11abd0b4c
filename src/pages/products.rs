//! Product form rules and save flow.

#[cfg(test)]
#[path = "products_test.rs"]
mod products_test;

use crate::net::api::{ApiError, ProductsApi, status_error};
use crate::net::http::{HttpResponse, HttpTransport};
use crate::net::types::ProductDraft;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 80;
pub const PRICE_MIN: f64 = 100.0;
pub const PRICE_MAX: f64 = 10_000_000.0;
pub const STOCK_MIN: u32 = 1;

/// One failed form rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("product form has {} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Check every rule of the product form, reporting all failures at once.
///
/// # Errors
///
/// Returns the failed rules in field order.
pub fn validate_product_draft(draft: &ProductDraft) -> Result<(), Vec<FieldError>> {
    let name_len = draft.name.trim().chars().count();
    let name_error = if name_len == 0 {
        Some("El nombre es obligatorio")
    } else if name_len < NAME_MIN_CHARS {
        Some("El nombre debe tener al menos 3 caracteres")
    } else if name_len > NAME_MAX_CHARS {
        Some("El nombre debe tener como máximo 80 caracteres")
    } else {
        None
    };

    let price_error = if !draft.price.is_finite() || draft.price < PRICE_MIN {
        Some("El precio debe ser mayor o igual a 100")
    } else if draft.price > PRICE_MAX {
        Some("El precio debe ser menor o igual a 10,000,000")
    } else {
        None
    };

    let stock_error = if draft.stock < STOCK_MIN {
        Some("El stock debe ser mayor o igual a 1")
    } else {
        None
    };

    let checks = [
        ("name", name_error),
        ("price", price_error),
        ("stock", stock_error),
    ];
    let errors: Vec<FieldError> = checks
        .into_iter()
        .filter_map(|(field, message)| {
            message.map(|message| FieldError { field, message })
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate `draft`, then create it or, with `id`, replace that product.
///
/// # Errors
///
/// Returns [`SaveError::Invalid`] without a request when a rule fails, and
/// [`SaveError::Api`] when the request fails or the server answers non-2xx.
pub async fn save_product<T: HttpTransport>(
    api: &ProductsApi<'_, T>,
    id: Option<&str>,
    draft: ProductDraft,
) -> Result<HttpResponse, SaveError> {
    validate_product_draft(&draft).map_err(SaveError::Invalid)?;
    let response = match id {
        Some(id) => api.update(id, &draft.with_id(id)).await?,
        None => api.create(&draft).await?,
    };
    if !response.ok() {
        tracing::warn!(status = response.status, "product save rejected");
        return Err(status_error(&response).into());
    }
    Ok(response)
}
