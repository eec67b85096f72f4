//! Request-side helpers shared by handlers: paging parameters and validation error collection.

use serde::Deserialize;

use crate::config::ApiConfig;
use crate::database::Pagination;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn pagination(&self, api: &ApiConfig) -> Pagination {
        Pagination::new(self.page, self.limit, api.default_page_size, api.max_page_size)
    }

    pub fn pagination_with_default(&self, default_limit: u32, api: &ApiConfig) -> Pagination {
        Pagination::new(self.page, self.limit, default_limit, api.max_page_size)
    }
}

/// Collects every field problem before rejecting, so the client sees them all at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn min_len(&mut self, value: &str, min: usize, message: impl Into<String>) -> &mut Self {
        self.check(value.trim().chars().count() >= min, message)
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(
                "Validation failed",
                std::mem::take(&mut self.errors),
            ))
        }
    }
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Trims entries and drops the blank ones.
pub fn non_blank(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Treats an empty query value as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
