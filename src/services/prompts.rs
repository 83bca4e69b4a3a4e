//! Prompt builders for the generation endpoint.
//!
//! Each prompt pins the expected output shape (strict JSON or a bare
//! number) and the output language, so the parser downstream can stay
//! strict.

use chrono::NaiveDate;

use crate::services::routing::TravelMode;
use crate::types::Coordinates;

/// Origin of a transport-cost estimate: either resolved device coordinates
/// or a free-text place name.
#[derive(Debug, Clone)]
pub enum Origin {
    Position(Coordinates),
    Place(String),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Position(coords) => write!(f, "Coordinates: {}, {}", coords.lat, coords.lng),
            Origin::Place(name) => write!(f, "{name}"),
        }
    }
}

/// Prompt for destination suggestions, optionally excluding ids that were
/// already shown so the AI proposes new places.
pub fn destination_prompt(activity: &str, exclude_ids: &[String]) -> String {
    let exclusion = if exclude_ids.is_empty() {
        String::new()
    } else {
        format!(
            "ただし、以下の旅行先は既に提案済みです: {}\n",
            exclude_ids.join(", ")
        )
    };

    format!(
        r#"あなたは旅行プランナーです。
ユーザーが「{activity}」をしたいと考えています。
{exclusion}この活動ができる日本国内の旅行先を3つ提案してください。

以下のJSON形式で返してください（マークダウンのコードブロックは不要）:
{{
  "destinations": [
    {{
      "id": "ユニークID（例: hokkaido-furano）",
      "name": "都道府県名 + 地域名（例: 北海道富良野）",
      "nameEn": "画像検索用の英語名 (例: Furano Hokkaido)",
      "description": "簡潔な説明（80文字以内）",
      "bestSeason": "ベストシーズン",
      "estimatedCost": 概算費用（数値のみ、例: 50000）,
      "highlights": ["特徴1", "特徴2", "特徴3"]
    }}
  ]
}}
"#
    )
}

/// Prompt for the full day-by-day itinerary.
pub fn itinerary_prompt(
    activity: &str,
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i64,
    budget: u32,
    preferences: Option<&str>,
) -> String {
    let preference_line = match preferences {
        Some(p) if !p.trim().is_empty() => format!("- その他の要望: {p}\n"),
        _ => String::new(),
    };

    format!(
        r#"あなたはプロの旅行プランナーです。以下の条件で{days}日間の詳細な旅行プランを作成してください:

【条件】
- 目的地: {destination}
- メインアクティビティ: {activity}
- 旅行期間: {start_date} から {end_date} ({days}日間)
- 予算: {budget}円
{preference_line}
以下のJSON形式で詳細なプランを返してください（マークダウンのコードブロックは不要）:
{{
  "summary": "プランの概要（100文字以内）",
  "itinerary": [
    {{
      "day": 1,
      "date": "YYYY-MM-DD",
      "title": "1日目のテーマ",
      "items": [
        {{
          "time": "09:00-12:00",
          "activity": "活動名",
          "location": "場所",
          "lat": 緯度（数値）,
          "lng": 経度（数値）,
          "cost": 金額（数値）,
          "description": "詳細説明",
          "notes": "注意事項やTips"
        }}
      ]
    }}
  ],
  "hotels": [
    {{
      "name": "ホテル名",
      "type": "ホテル・旅館・民宿など",
      "address": "住所",
      "pricePerNight": 一泊あたりの料金（数値）,
      "totalNights": 宿泊数,
      "rating": 4.5,
      "amenities": ["アメニティ1", "アメニティ2"],
      "reason": "このホテルを選んだ理由"
    }}
  ],
  "budgetBreakdown": {{
    "transportation": 交通費（数値）,
    "accommodation": 宿泊費（数値）,
    "activities": アクティビティ費（数値）,
    "meals": 食費（数値）,
    "other": その他（数値）,
    "total": 合計金額（数値）
  }},
  "tips": ["旅行のアドバイス1", "アドバイス2", "アドバイス3"],
  "packingList": ["持ち物1", "持ち物2", "持ち物3"]
}}

注意: 予算{budget}円を大幅に超えないように計画してください。
出力言語: 日本語
"#
    )
}

/// Prompt for a point-to-point fare. The answer must be a bare number.
pub fn fare_prompt(origin: &str, destination: &str, mode: TravelMode) -> String {
    format!(
        "Tell me the fare for traveling from {origin} to {destination} by {mode}. \
         Return only the number in Japanese Yen (JPY) format like \"1500\". Only number."
    )
}

/// Prompt for the cheapest one-way transport cost from the user's location
/// to a destination. The answer must be a bare number in yen.
pub fn transport_cost_prompt(origin: &Origin, destination: &str) -> String {
    format!(
        r#"あなたは旅行アシスタントです。
以下の出発地から日本国内の目的地までの、大人1人分の最も安い片道交通費（電車、バス、または飛行機）を推定してください。

出発地: {origin}
目的地: {destination}

出発地が座標の場合は、まず最寄りの主要な駅/空港を見つけてください。
日本円での推定費用のみを数値で返してください。テキストや記号は含めないでください。
例: 12000
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_prompt_lists_exclusions_only_when_present() {
        let prompt = destination_prompt("スカイダイビング", &[]);
        assert!(prompt.contains("スカイダイビング"));
        assert!(!prompt.contains("提案済み"));

        let exclude = vec!["hokkaido-furano".to_string(), "okinawa-ishigaki".to_string()];
        let prompt = destination_prompt("スカイダイビング", &exclude);
        assert!(prompt.contains("hokkaido-furano, okinawa-ishigaki"));
        assert!(prompt.contains("提案済み"));
    }

    #[test]
    fn itinerary_prompt_carries_dates_budget_and_preferences() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let prompt = itinerary_prompt(
            "スキー",
            "北海道富良野",
            start,
            end,
            3,
            100000,
            Some("子供連れ"),
        );

        assert!(prompt.contains("3日間"));
        assert!(prompt.contains("2025-06-01 から 2025-06-03"));
        assert!(prompt.contains("予算: 100000円"));
        assert!(prompt.contains("子供連れ"));
        assert!(prompt.contains("出力言語: 日本語"));
    }

    #[test]
    fn itinerary_prompt_omits_empty_preferences() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let prompt = itinerary_prompt("温泉", "大分県別府", start, end, 2, 50000, None);
        assert!(!prompt.contains("その他の要望"));
    }

    #[test]
    fn transport_cost_prompt_renders_coordinates() {
        let origin = Origin::Position(Coordinates::new(35.6812, 139.7671));
        let prompt = transport_cost_prompt(&origin, "北海道富良野");
        assert!(prompt.contains("Coordinates: 35.6812, 139.7671"));
        assert!(prompt.contains("北海道富良野"));
    }

    #[test]
    fn fare_prompt_names_both_endpoints_and_mode() {
        let prompt = fare_prompt("東京駅", "渋谷駅", TravelMode::Transit);
        assert!(prompt.contains("東京駅"));
        assert!(prompt.contains("渋谷駅"));
        assert!(prompt.contains("TRANSIT"));
        assert!(prompt.contains("Only number"));
    }
}
