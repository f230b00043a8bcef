//! Sample catalog for a fresh install
//!
//! Each sample dish is inserted only when no dish of the same name exists, so
//! seeding twice, or seeding a catalog that already holds a dish, is safe.

use cafe_common::{DishDraft, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::dishes;

struct SampleDish {
    name: &'static str,
    name_en: &'static str,
    category: &'static str,
    price: i64,
    description: &'static str,
    chef_comment: &'static str,
    recommendation: &'static str,
    pairing_suggestion: &'static str,
    ingredients: &'static [&'static str],
    allergens: &'static [&'static str],
    keywords: &'static [&'static str],
    calories: i64,
    popular: bool,
}

const SAMPLE_DISHES: &[SampleDish] = &[
    SampleDish {
        name: "チーズケーキ",
        name_en: "Cheese Cake",
        category: "デザート",
        price: 520,
        description: "濃厚でなめらかなクリームチーズを使用した当店自慢のデザートです",
        chef_comment: "北海道産クリームチーズを使用した濃厚な味わいをお楽しみください。当店で一番人気のデザートです。",
        recommendation: "食後のデザートに最適です。甘さ控えめで上品な味わいです。",
        pairing_suggestion: "ブレンドコーヒーや紅茶と相性抜群です",
        ingredients: &["クリームチーズ", "卵", "小麦粉", "砂糖", "バター", "バニラエッセンス"],
        allergens: &["乳製品", "卵", "小麦"],
        keywords: &["チーズケーキ", "ケーキ", "デザート", "スイーツ"],
        calories: 350,
        popular: true,
    },
    SampleDish {
        name: "ブレンドコーヒー",
        name_en: "Blend Coffee",
        category: "ドリンク",
        price: 380,
        description: "厳選された豆をブレンドした香り豊かなコーヒーです",
        chef_comment: "ブラジルとコロンビア産の豆を絶妙にブレンド。深い香りとまろやかな味わいが特徴です。",
        recommendation: "モーニングやランチタイム、いつでもお楽しみいただけます。",
        pairing_suggestion: "チーズケーキやクッキーとの相性が抜群です",
        ingredients: &["コーヒー豆（ブラジル産）", "コーヒー豆（コロンビア産）"],
        allergens: &[],
        keywords: &["コーヒー", "ブレンド", "ドリンク", "カフェイン"],
        calories: 5,
        popular: true,
    },
    SampleDish {
        name: "クラブハウスサンドイッチ",
        name_en: "Club House Sandwich",
        category: "フード",
        price: 890,
        description: "チキン、ベーコン、野菜をたっぷり挟んだボリューム満点のサンドイッチ",
        chef_comment: "新鮮な野菜とジューシーなチキン、カリカリベーコンの絶妙なハーモニーをお楽しみください。",
        recommendation: "ランチタイムにぴったり。ボリューム満点で満足感があります。",
        pairing_suggestion: "アイスコーヒーやレモネードとよく合います",
        ingredients: &["食パン", "チキン", "ベーコン", "レタス", "トマト", "マヨネーズ"],
        allergens: &["小麦", "卵", "大豆"],
        keywords: &["サンドイッチ", "チキン", "ベーコン", "ランチ"],
        calories: 650,
        popular: false,
    },
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl SampleDish {
    fn draft(&self) -> DishDraft {
        DishDraft {
            name_en: Some(self.name_en.to_string()),
            price: Some(self.price),
            description: self.description.to_string(),
            chef_comment: Some(self.chef_comment.to_string()),
            recommendation: Some(self.recommendation.to_string()),
            pairing_suggestion: Some(self.pairing_suggestion.to_string()),
            ingredients: owned(self.ingredients),
            allergens: owned(self.allergens),
            keywords: owned(self.keywords),
            calories: Some(self.calories),
            popular: self.popular,
            ..DishDraft::new(self.name, self.category)
        }
    }
}

/// The bundled sample dishes
pub fn sample_dishes() -> Vec<DishDraft> {
    SAMPLE_DISHES.iter().map(SampleDish::draft).collect()
}

/// Insert the sample dishes that are not in the catalog yet
///
/// Returns how many dishes were added.
pub async fn seed_sample_dishes(pool: &SqlitePool) -> Result<usize> {
    let mut added = 0;
    for draft in sample_dishes() {
        if dishes::name_exists(pool, &draft.name).await? {
            info!(dish = %draft.name, "Sample dish already present, skipping");
            continue;
        }
        draft.validate()?;
        let dish = draft.into_dish();
        dishes::insert_dish(pool, &dish).await?;
        info!(dish = %dish.name, dish_id = %dish.id, "Added sample dish");
        added += 1;
    }
    Ok(added)
}
