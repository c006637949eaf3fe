use std::sync::Arc;
use tracing::debug;

use crate::config::gateways::GatewaysConfig;
use crate::domain::Gateway;
use crate::error::AppError;
use crate::ports::{CountryRepository, GatewayRepository, UserRepository};

use super::context::RequestContext;

/// Picks the gateway that services a transaction from per-country priorities.
#[derive(Clone)]
pub struct GatewaySelector {
    config: Arc<GatewaysConfig>,
    gateways: Arc<dyn GatewayRepository>,
    countries: Arc<dyn CountryRepository>,
    users: Arc<dyn UserRepository>,
}

impl GatewaySelector {
    pub fn new(
        config: Arc<GatewaysConfig>,
        gateways: Arc<dyn GatewayRepository>,
        countries: Arc<dyn CountryRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            config,
            gateways,
            countries,
            users,
        }
    }

    pub async fn select_for_user(
        &self,
        ctx: &RequestContext,
        user_id: i64,
    ) -> Result<Gateway, AppError> {
        let user = ctx
            .run(self.users.find_by_id(user_id))
            .await
            .map_err(|_| AppError::Cancelled)?
            .map_err(|e| AppError::from(e).context("resolve user"))?;

        let country = ctx
            .run(self.countries.find_by_id(user.country_id))
            .await
            .map_err(|_| AppError::Cancelled)?
            .map_err(|e| AppError::from(e).context("resolve user country"))?;

        self.select_for_country(ctx, &country.code).await
    }

    pub async fn select_for_country(
        &self,
        ctx: &RequestContext,
        country_code: &str,
    ) -> Result<Gateway, AppError> {
        let name = self.preferred_gateway(country_code)?;
        debug!(country = country_code, gateway = name, "Gateway selected by priority");

        ctx.run(self.gateways.find_by_name(name))
            .await
            .map_err(|_| AppError::Cancelled)?
            .map_err(|e| AppError::from(e).context("resolve selected gateway"))
    }

    /// Highest priority wins; equal priorities go to the smallest name.
    fn preferred_gateway(&self, country_code: &str) -> Result<&str, AppError> {
        let candidates = self
            .config
            .country(country_code)
            .map(|country| &country.gateways)
            .filter(|gateways| !gateways.is_empty())
            .ok_or_else(|| AppError::NotConfigured(format!("country {}", country_code)))?;

        candidates
            .iter()
            .max_by(|(a_name, a_priority), (b_name, b_priority)| {
                a_priority.cmp(b_priority).then_with(|| b_name.cmp(a_name))
            })
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| AppError::NotConfigured(format!("country {}", country_code)))
    }
}
