//! Inline keyboards for the category, subcategory and source menus.

use tally_core::Catalog;

use crate::config::KeyboardLayout;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram rejects callback data longer than this many bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;

pub const CATEGORY_PREFIX: &str = "cat_";
pub const SUBCATEGORY_PREFIX: &str = "sub_";
pub const SET_SOURCE_PREFIX: &str = "set_source_";

pub const SMS: &str = "sms";
pub const SMS_BACK: &str = "sms_back";
pub const CHANGE_SOURCE: &str = "change_source";
pub const BACK_TO_CATEGORIES: &str = "back_to_categories";
pub const BACK_TO_CATEGORIES_FROM_SOURCE: &str = "back_to_categories_from_source";

const BACK_LABEL: &str = "⬅️ Назад";

fn button(text: &str, data: String) -> InlineKeyboardButton {
    InlineKeyboardButton {
        text: text.to_string(),
        callback_data: truncate_at_char_boundary(data, CALLBACK_DATA_LIMIT),
    }
}

fn truncate_at_char_boundary(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

fn grid(buttons: Vec<InlineKeyboardButton>, per_row: usize) -> Vec<Vec<InlineKeyboardButton>> {
    buttons
        .chunks(per_row.max(1))
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect()
}

/// Categories, then a row with the SMS and source buttons.
pub fn categories(
    catalog: &Catalog,
    source: Option<&str>,
    layout: &KeyboardLayout,
) -> InlineKeyboardMarkup {
    let buttons = catalog
        .categories
        .iter()
        .map(|c| button(c, format!("{CATEGORY_PREFIX}{c}")))
        .collect();
    let mut rows = grid(buttons, layout.categories_per_row);

    let source_label = match source {
        Some(s) => format!("Источник: {s}"),
        None => "Источник (не выбран)".to_string(),
    };
    rows.push(vec![
        button("СМС", SMS.to_string()),
        button(&source_label, CHANGE_SOURCE.to_string()),
    ]);
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

pub fn subcategories(
    catalog: &Catalog,
    category: &str,
    layout: &KeyboardLayout,
) -> InlineKeyboardMarkup {
    let buttons = catalog
        .subcategories_of(category)
        .iter()
        .map(|s| button(s, format!("{SUBCATEGORY_PREFIX}{s}")))
        .collect();
    let mut rows = grid(buttons, layout.subcategories_per_row);
    rows.push(vec![button(BACK_LABEL, BACK_TO_CATEGORIES.to_string())]);
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

pub fn sources(catalog: &Catalog, layout: &KeyboardLayout) -> InlineKeyboardMarkup {
    let buttons = catalog
        .sources
        .iter()
        .map(|s| button(s, format!("{SET_SOURCE_PREFIX}{s}")))
        .collect();
    let mut rows = grid(buttons, layout.sources_per_row);
    rows.push(vec![button(
        BACK_LABEL,
        BACK_TO_CATEGORIES_FROM_SOURCE.to_string(),
    )]);
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

pub fn sms_back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![button(BACK_LABEL, SMS_BACK.to_string())]],
    }
}
