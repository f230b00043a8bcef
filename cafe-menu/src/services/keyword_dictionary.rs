//! Keyword dictionaries
//!
//! Static tables that turn English labels from the image-labeling service
//! into the vocabulary the catalog uses (Japanese synonyms, category buckets),
//! plus the generic-keyword stoplist applied before matching.
//!
//! All lookups are case-insensitive.

use std::collections::HashSet;

/// English label → localized synonyms
const LABEL_TRANSLATIONS: &[(&str, &[&str])] = &[
    // food & drink
    ("food", &["食べ物", "フード"]),
    ("drink", &["飲み物", "ドリンク"]),
    ("beverage", &["飲み物", "ドリンク"]),
    // desserts & sweets
    ("dessert", &["デザート", "スイーツ"]),
    ("cake", &["ケーキ"]),
    ("cheesecake", &["チーズケーキ", "ケーキ"]),
    ("chocolate", &["チョコレート", "チョコ"]),
    ("ice cream", &["アイスクリーム", "アイス"]),
    ("cookie", &["クッキー"]),
    ("pastry", &["ペストリー", "パン菓子"]),
    ("pie", &["パイ"]),
    ("tart", &["タルト"]),
    ("pudding", &["プリン"]),
    ("parfait", &["パフェ"]),
    ("pancake", &["パンケーキ"]),
    ("waffle", &["ワッフル"]),
    // coffee & tea
    ("coffee", &["コーヒー"]),
    ("espresso", &["エスプレッソ"]),
    ("latte", &["ラテ", "カフェラテ"]),
    ("cappuccino", &["カプチーノ"]),
    ("tea", &["茶", "ティー"]),
    ("green tea", &["緑茶"]),
    ("black tea", &["紅茶"]),
    ("matcha", &["抹茶"]),
    ("juice", &["ジュース"]),
    ("lemonade", &["レモネード"]),
    // bread & sandwiches
    ("bread", &["パン"]),
    ("sandwich", &["サンドイッチ"]),
    ("toast", &["トースト"]),
    ("bagel", &["ベーグル"]),
    ("croissant", &["クロワッサン"]),
    ("burger", &["ハンバーガー", "バーガー"]),
    ("hamburger", &["ハンバーガー", "バーガー"]),
    ("pizza", &["ピザ"]),
    // meat & fish
    ("meat", &["肉"]),
    ("chicken", &["チキン", "鶏肉"]),
    ("beef", &["ビーフ", "牛肉"]),
    ("pork", &["ポーク", "豚肉"]),
    ("fish", &["魚"]),
    ("salmon", &["サーモン", "鮭"]),
    ("tuna", &["ツナ", "マグロ"]),
    ("bacon", &["ベーコン"]),
    ("ham", &["ハム"]),
    ("sausage", &["ソーセージ"]),
    // vegetables & fruit
    ("vegetable", &["野菜"]),
    ("fruit", &["果物", "フルーツ"]),
    ("salad", &["サラダ"]),
    ("tomato", &["トマト"]),
    ("lettuce", &["レタス"]),
    ("onion", &["玉ねぎ"]),
    ("potato", &["ポテト", "じゃがいも"]),
    ("french fries", &["フライドポテト", "ポテト"]),
    ("strawberry", &["いちご", "ストロベリー"]),
    ("banana", &["バナナ"]),
    ("lemon", &["レモン"]),
    // dairy
    ("milk", &["ミルク", "牛乳"]),
    ("cheese", &["チーズ"]),
    ("butter", &["バター"]),
    ("cream", &["クリーム"]),
    ("whipped cream", &["ホイップクリーム", "生クリーム"]),
    ("yogurt", &["ヨーグルト"]),
    // other
    ("egg", &["卵"]),
    ("rice", &["米", "ライス"]),
    ("curry", &["カレー"]),
    ("pasta", &["パスタ"]),
    ("spaghetti", &["スパゲッティ", "パスタ"]),
    ("noodle", &["麺", "ヌードル"]),
    ("soup", &["スープ"]),
    ("sauce", &["ソース"]),
    ("sugar", &["砂糖"]),
    ("salt", &["塩"]),
];

/// Category → keywords describing the category
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("デザート", &["dessert", "sweet", "甘い", "スイーツ", "甘味"]),
    ("軽食", &["light meal", "snack", "軽食", "ランチ", "つまみ"]),
    ("ドリンク", &["drink", "beverage", "飲み物", "飲料", "ドリンク"]),
    ("フード", &["food", "dish", "料理", "食べ物", "メイン"]),
    ("サラダ", &["salad", "vegetables", "野菜", "ヘルシー", "フレッシュ"]),
    ("サイド", &["side", "side dish", "サイド", "付け合わせ"]),
];

/// Category used when a dish category has no dictionary entry
const DEFAULT_CATEGORY_KEYWORDS: &[&str] = &["food", "料理"];

/// Category → terms that suggest the category when seen in an image
const CATEGORY_HINTS: &[(&str, &[&str])] = &[
    (
        "ドリンク",
        &[
            "drink", "beverage", "coffee", "espresso", "latte", "cappuccino", "tea",
            "green tea", "black tea", "matcha", "juice", "lemonade", "milk", "cup",
            "coffee cup", "ドリンク", "飲み物", "コーヒー", "ラテ", "紅茶", "緑茶", "ジュース",
        ],
    ),
    (
        "デザート",
        &[
            "dessert", "cake", "cheesecake", "chocolate", "ice cream", "cookie", "pastry",
            "pie", "tart", "pudding", "parfait", "pancake", "waffle", "whipped cream",
            "sweetness", "デザート", "スイーツ", "ケーキ", "チョコレート", "アイス", "プリン",
        ],
    ),
    (
        "サラダ",
        &[
            "salad", "vegetable", "lettuce", "leaf vegetable", "tomato", "サラダ", "野菜",
            "レタス",
        ],
    ),
    (
        "フード",
        &[
            "sandwich", "bread", "toast", "bagel", "croissant", "burger", "hamburger",
            "pizza", "meat", "chicken", "beef", "pork", "fish", "salmon", "bacon", "pasta",
            "spaghetti", "noodle", "rice", "curry", "soup", "egg", "サンドイッチ", "パン",
            "パスタ", "カレー", "スープ", "チキン",
        ],
    ),
];

/// English term → related keywords used when generating dish keywords
const SEMANTIC_MAPPING: &[(&str, &[&str])] = &[
    ("sandwich", &["サンドイッチ", "パン", "軽食"]),
    ("bread", &["パン", "食パン", "ベーカリー"]),
    ("cake", &["ケーキ", "デザート", "スイーツ"]),
    ("chocolate", &["チョコレート", "チョコ", "カカオ"]),
    ("coffee", &["コーヒー", "カフェ", "エスプレッソ"]),
    ("salad", &["サラダ", "野菜", "ヘルシー"]),
    ("pasta", &["パスタ", "麺類", "イタリアン"]),
    ("pizza", &["ピザ", "イタリアン", "チーズ"]),
    ("burger", &["ハンバーガー", "バーガー", "ファストフード"]),
    ("soup", &["スープ", "汁物", "ポタージュ"]),
    ("meat", &["肉", "ミート", "プロテイン"]),
    ("fish", &["魚", "シーフード", "魚介"]),
    ("vegetable", &["野菜", "ベジタブル", "ヘルシー"]),
    ("fruit", &["フルーツ", "果物", "ビタミン"]),
    ("cheese", &["チーズ", "チーズ系", "乳製品"]),
    ("cream", &["クリーム", "クリーミー", "生クリーム"]),
];

/// Dish-name fragment → keywords implied by the name
const NAME_PATTERNS: &[(&str, &[&str])] = &[
    ("ケーキ", &["cake", "dessert", "sweet", "デザート"]),
    ("サンドイッチ", &["sandwich", "bread", "light meal", "軽食"]),
    ("コーヒー", &["coffee", "drink", "caffeine", "ドリンク"]),
    ("ラテ", &["latte", "coffee", "milk", "ドリンク"]),
    ("サラダ", &["salad", "vegetables", "healthy", "ヘルシー"]),
    ("パスタ", &["pasta", "italian", "noodles", "麺類"]),
    ("ピザ", &["pizza", "italian", "cheese", "イタリアン"]),
    ("ハンバーガー", &["burger", "fast food", "meat", "ファストフード"]),
    ("スープ", &["soup", "liquid", "warm", "汁物"]),
    ("チョコ", &["chocolate", "cacao", "sweet", "デザート"]),
];

/// Keywords too generic to discriminate between dishes
const GENERIC_KEYWORDS: &[&str] = &[
    // generic nouns
    "food", "dish", "dishes", "plate", "tableware", "dishware", "serveware", "cuisine",
    "ingredient", "recipe", "produce", "meal", "table", "kitchen utensil", "cutlery",
    "fork", "spoon", "bowl", "cup", "saucer", "drinkware", "still life photography",
    "close-up", "photography", "delicacy", "comfort food", "finger food", "fast food",
    "staple food", "baked goods", "natural foods", "wood", "font", "text",
    // colours
    "white", "black", "red", "green", "blue", "yellow", "brown", "pink", "purple",
    "beige", "gray", "grey", "colorfulness",
    // localized generic nouns
    "食べ物", "フード", "料理", "食品", "皿", "食器", "美味しそう",
];

fn lookup<'a>(table: &'a [(&'a str, &'a [&'a str])], key: &str) -> Option<&'a [&'a str]> {
    let key = key.trim().to_lowercase();
    table
        .iter()
        .find(|(k, _)| k.to_lowercase() == key)
        .map(|(_, v)| *v)
}

/// Whether the label has an entry in the translation table
pub fn is_food_related(label: &str) -> bool {
    lookup(LABEL_TRANSLATIONS, label).is_some()
}

/// Localized synonyms for an English label; unknown labels map to themselves
pub fn translate_label(label: &str) -> Vec<String> {
    match lookup(LABEL_TRANSLATIONS, label) {
        Some(synonyms) => synonyms.iter().map(|s| s.to_string()).collect(),
        None => vec![label.trim().to_string()],
    }
}

/// Keywords describing a category
pub fn category_keywords(category: &str) -> &'static [&'static str] {
    lookup(CATEGORY_KEYWORDS, category).unwrap_or(DEFAULT_CATEGORY_KEYWORDS)
}

/// Related keywords for an English term (empty when unknown)
pub fn semantic_mapping(term: &str) -> &'static [&'static str] {
    lookup(SEMANTIC_MAPPING, term).unwrap_or(&[])
}

/// Keywords implied by fragments of a dish name
pub fn name_based_keywords(dish_name: &str) -> Vec<&'static str> {
    let lower = dish_name.to_lowercase();
    NAME_PATTERNS
        .iter()
        .filter(|(pattern, _)| lower.contains(&pattern.to_lowercase()))
        .flat_map(|(_, keywords)| keywords.iter().copied())
        .collect()
}

/// Whether a keyword is on the generic stoplist
pub fn is_generic(keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    GENERIC_KEYWORDS.iter().any(|g| g.to_lowercase() == keyword)
}

/// Infer the most likely category bucket from a set of keywords
///
/// Each keyword equal to a category hint counts one vote; ties go to the
/// category listed first. Returns `None` when nothing matches.
pub fn infer_category<S: AsRef<str>>(keywords: &[S]) -> Option<&'static str> {
    let lowered: Vec<String> = keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .collect();

    let mut best: Option<(&'static str, usize)> = None;
    for (category, hints) in CATEGORY_HINTS {
        let votes = hints
            .iter()
            .filter(|hint| lowered.iter().any(|k| k == &hint.to_lowercase()))
            .count();
        if votes == 0 {
            continue;
        }
        match best {
            Some((_, best_votes)) if best_votes >= votes => {}
            _ => best = Some((category, votes)),
        }
    }

    best.map(|(category, _)| category)
}

/// Food terms found in free text (e.g. text printed on a menu)
///
/// English dictionary terms must appear as whole words; localized synonyms of
/// two or more characters are matched as substrings since the script has no
/// word separators. A synonym that only occurs inside a longer matched one
/// (パン inside パンケーキ) is not reported. Results are lower-cased and in
/// dictionary order.
pub fn food_terms_in_text(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let padded: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() && c.is_ascii() { c } else { ' ' })
        .collect();
    let padded = format!(" {} ", padded.split_whitespace().collect::<Vec<_>>().join(" "));

    let localized = localized_terms_in_text(&lower);

    let mut terms = Vec::new();
    for (label, synonyms) in LABEL_TRANSLATIONS {
        if padded.contains(&format!(" {} ", label)) {
            terms.push(label.to_string());
        }
        terms.extend(
            synonyms
                .iter()
                .filter(|s| localized.contains(*s))
                .map(|s| s.to_string()),
        );
    }

    cafe_common::keywords::normalize_keywords(terms)
}

/// Localized synonyms present in `text`, longest first; each match is masked
/// out so shorter synonyms cannot match inside it
fn localized_terms_in_text(text: &str) -> HashSet<&'static str> {
    let mut candidates: Vec<&'static str> = LABEL_TRANSLATIONS
        .iter()
        .flat_map(|(_, synonyms)| synonyms.iter().copied())
        .filter(|s| s.chars().count() >= 2)
        .collect();
    candidates.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));

    let mut remaining = text.to_string();
    let mut found = HashSet::new();
    for synonym in candidates {
        if remaining.contains(synonym) {
            remaining = remaining.replace(synonym, "\u{0}");
            found.insert(synonym);
        }
    }
    found
}
