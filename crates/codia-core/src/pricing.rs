//! Price table for generations.
//!
//! Prices are fixed server-side and keyed by generation category. Callers only
//! name the category; they never send a cost.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Kinds of generation a user can pay for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationCategory {
    /// Logo image.
    Logo,
    /// Sales copy for a product or page.
    Copywriter,
    /// Brand voice profile, reused as context by later text generations.
    BrandVoice,
    /// Full storefront structure and texts.
    Storefront,
    /// Multi-channel marketing campaign.
    MarketingCampaign,
    /// Short product description.
    ProductDescription,
    /// Product photo.
    ProductImage,
}

impl GenerationCategory {
    /// All categories, in price-table order.
    pub const ALL: [Self; 7] = [
        Self::Logo,
        Self::Copywriter,
        Self::BrandVoice,
        Self::Storefront,
        Self::MarketingCampaign,
        Self::ProductDescription,
        Self::ProductImage,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Copywriter => "copywriter",
            Self::BrandVoice => "brand_voice",
            Self::Storefront => "storefront",
            Self::MarketingCampaign => "marketing_campaign",
            Self::ProductDescription => "product_description",
            Self::ProductImage => "product_image",
        }
    }

    /// Whether the upstream call is an image generation.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Logo | Self::ProductImage)
    }

    /// Whether the stored brand voice is attached as context.
    #[must_use]
    pub const fn uses_brand_voice(&self) -> bool {
        matches!(
            self,
            Self::Copywriter
                | Self::Storefront
                | Self::MarketingCampaign
                | Self::ProductDescription
        )
    }

    /// Whether a generation request must carry `details`.
    #[must_use]
    pub const fn requires_details(&self) -> bool {
        matches!(
            self,
            Self::Copywriter
                | Self::MarketingCampaign
                | Self::ProductDescription
                | Self::ProductImage
        )
    }
}

impl fmt::Display for GenerationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownCategory(s.to_string()))
    }
}

/// Price entry for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPrice {
    /// Credits charged.
    pub credits: i64,
    /// XP awarded on success.
    pub xp_reward: i64,
    /// What a professional would have charged, in cents.
    pub saved_money_cents: i64,
}

/// The full price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTable {
    prices: HashMap<GenerationCategory, CategoryPrice>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let entries = [
            (GenerationCategory::Logo, 5, 50, 30_000),
            (GenerationCategory::Copywriter, 4, 40, 15_000),
            (GenerationCategory::BrandVoice, 3, 30, 20_000),
            (GenerationCategory::Storefront, 10, 100, 80_000),
            (GenerationCategory::MarketingCampaign, 6, 60, 25_000),
            (GenerationCategory::ProductDescription, 2, 20, 5_000),
            (GenerationCategory::ProductImage, 5, 50, 10_000),
        ];

        let prices = entries
            .into_iter()
            .map(|(category, credits, xp_reward, saved_money_cents)| {
                (
                    category,
                    CategoryPrice {
                        credits,
                        xp_reward,
                        saved_money_cents,
                    },
                )
            })
            .collect();

        Self { prices }
    }
}

impl PriceTable {
    /// Price for a category.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownCategory` if the table has no entry.
    pub fn price(&self, category: GenerationCategory) -> Result<CategoryPrice, LedgerError> {
        self.prices
            .get(&category)
            .copied()
            .ok_or_else(|| LedgerError::UnknownCategory(category.to_string()))
    }

    /// Resolve a category name straight to its price.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownCategory` for names not in the table.
    pub fn price_by_name(
        &self,
        name: &str,
    ) -> Result<(GenerationCategory, CategoryPrice), LedgerError> {
        let category: GenerationCategory = name.parse()?;
        Ok((category, self.price(category)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_positive_price() {
        let table = PriceTable::default();
        for category in GenerationCategory::ALL {
            let price = table.price(category).unwrap();
            assert!(price.credits > 0, "{category} must cost something");
            assert!(price.xp_reward > 0);
        }
    }

    #[test]
    fn logo_and_copywriter_prices() {
        let table = PriceTable::default();
        assert_eq!(table.price(GenerationCategory::Logo).unwrap().credits, 5);
        assert_eq!(table.price(GenerationCategory::Copywriter).unwrap().credits, 4);
    }

    #[test]
    fn names_parse_back_to_categories() {
        for category in GenerationCategory::ALL {
            assert_eq!(category.as_str().parse::<GenerationCategory>().unwrap(), category);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = PriceTable::default().price_by_name("tattoo").unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCategory(name) if name == "tattoo"));
    }

    #[test]
    fn detail_requirements() {
        let required: Vec<_> = GenerationCategory::ALL
            .into_iter()
            .filter(GenerationCategory::requires_details)
            .collect();
        assert_eq!(
            required,
            vec![
                GenerationCategory::Copywriter,
                GenerationCategory::MarketingCampaign,
                GenerationCategory::ProductDescription,
                GenerationCategory::ProductImage,
            ]
        );
    }

    #[test]
    fn serde_names_match_as_str() {
        let json = serde_json::to_string(&GenerationCategory::MarketingCampaign).unwrap();
        assert_eq!(json, "\"marketing_campaign\"");
    }
}
