//! Approximate per-image pricing. The same table backs the server's echoed
//! `estimatedCost` and the client's pre-flight display.

use crate::models::{ImageModel, Quality};

const DALLE3_STANDARD: f64 = 0.040;
const DALLE3_HD: f64 = 0.080;

const GPT_IMAGE_LOW: f64 = 0.020;
const GPT_IMAGE_MEDIUM: f64 = 0.070;
const GPT_IMAGE_HIGH: f64 = 0.190;

/// Estimated USD cost of one generated image. Total over every quality value:
/// anything unrecognized is priced at the model's medium/standard tier.
pub fn estimate(model: ImageModel, quality: &Quality) -> f64 {
    match model {
        ImageModel::DallE3 => match quality {
            Quality::High | Quality::Hd => DALLE3_HD,
            _ => DALLE3_STANDARD,
        },
        ImageModel::GptImage1 => match quality {
            Quality::Low | Quality::Standard => GPT_IMAGE_LOW,
            Quality::Medium | Quality::Auto => GPT_IMAGE_MEDIUM,
            Quality::High | Quality::Hd => GPT_IMAGE_HIGH,
            Quality::Other(_) => GPT_IMAGE_MEDIUM,
        },
    }
}

/// Estimated USD cost of one edit. Edits fall back to the standard tier.
pub fn estimate_edit(quality: &Quality) -> f64 {
    match quality {
        Quality::Low | Quality::Standard => GPT_IMAGE_LOW,
        Quality::Medium | Quality::Auto => GPT_IMAGE_MEDIUM,
        Quality::High | Quality::Hd => GPT_IMAGE_HIGH,
        Quality::Other(_) => GPT_IMAGE_LOW,
    }
}

pub fn format_cost(cost: f64) -> String {
    format!("${:.3}", cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualities() -> Vec<Quality> {
        vec![
            Quality::Standard,
            Quality::Hd,
            Quality::Low,
            Quality::Medium,
            Quality::High,
            Quality::Auto,
            Quality::Other("ultra".into()),
            Quality::Other(String::new()),
        ]
    }

    #[test]
    fn every_pair_has_a_positive_cost() {
        for model in [ImageModel::DallE3, ImageModel::GptImage1] {
            for quality in qualities() {
                let cost = estimate(model, &quality);
                assert!(cost.is_finite() && cost > 0.0, "{} {}", model, quality);
            }
        }
        for quality in qualities() {
            assert!(estimate_edit(&quality) > 0.0);
        }
    }

    #[test]
    fn known_prices() {
        assert_eq!(estimate(ImageModel::DallE3, &Quality::Standard), 0.04);
        assert_eq!(estimate(ImageModel::DallE3, &Quality::High), 0.08);
        assert_eq!(estimate(ImageModel::GptImage1, &Quality::Low), 0.02);
        assert_eq!(estimate(ImageModel::GptImage1, &Quality::Auto), 0.07);
        assert_eq!(estimate(ImageModel::GptImage1, &Quality::Other("x".into())), 0.07);
        assert_eq!(estimate_edit(&Quality::High), 0.19);
        assert_eq!(estimate_edit(&Quality::Other("x".into())), 0.02);
    }

    #[test]
    fn formatted_cost_has_three_decimals() {
        for model in [ImageModel::DallE3, ImageModel::GptImage1] {
            for quality in qualities() {
                let text = format_cost(estimate(model, &quality));
                let digits = text.strip_prefix('$').unwrap();
                let (whole, frac) = digits.split_once('.').unwrap();
                assert!(!whole.is_empty() && whole.chars().all(|c| c.is_ascii_digit()));
                assert_eq!(frac.len(), 3, "{}", text);
            }
        }
        assert_eq!(format_cost(0.19), "$0.190");
    }
}
