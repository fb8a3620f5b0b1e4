use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use serde_json::json;
use tally_cli::bot::{Conversation, ConversationOptions};
use tally_cli::config::KeyboardLayout;
use tally_cli::telegram::{Action, Update};
use tally_ledger::{LedgerError, MemoryLedger};

const CHAT: i64 = 42;
const MENU_MESSAGE: i64 = 500;
// 2024-06-09 12:00 Tashkent
const MESSAGE_UNIX: i64 = 1717916400;

fn system_rows() -> Vec<Vec<String>> {
    [
        ["Категория", "Подкатегория", "", "", "", "Источник"],
        ["Еда", "Кафе", "", "", "", "Humo UZS"],
        ["Еда", "Продукты", "", "", "", "Visa USD"],
        ["Транспорт", "Такси", "", "", "", ""],
    ]
    .iter()
    .map(|r| r.iter().map(|s| s.to_string()).collect())
    .collect()
}

fn options() -> ConversationOptions {
    ConversationOptions {
        layout: KeyboardLayout {
            categories_per_row: 3,
            subcategories_per_row: 2,
            sources_per_row: 2,
        },
        sms_excerpt_chars: 30,
        fallback_currency: "XXX".to_string(),
        timezone: chrono_tz::Asia::Tashkent,
    }
}

fn now() -> DateTime<Tz> {
    chrono_tz::Asia::Tashkent
        .with_ymd_and_hms(2024, 6, 9, 12, 0, 0)
        .unwrap()
}

fn text(message_id: i64, body: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": message_id,
        "message": {
            "message_id": message_id,
            "date": MESSAGE_UNIX,
            "chat": {"id": CHAT},
            "from": {"id": CHAT, "first_name": "Aziz"},
            "text": body,
        }
    }))
    .unwrap()
}

fn press(data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": 9000,
        "callback_query": {
            "id": "cb",
            "from": {"id": CHAT, "first_name": "Aziz"},
            "message": {"message_id": MENU_MESSAGE, "date": MESSAGE_UNIX, "chat": {"id": CHAT}},
            "data": data,
        }
    }))
    .unwrap()
}

fn action_text(a: &Action) -> &str {
    match a {
        Action::Send { text, .. } | Action::Edit { text, .. } => text,
        Action::Delete { .. } => "",
    }
}

async fn connected() -> Conversation<MemoryLedger> {
    let mut conv = Conversation::new(MemoryLedger::new(system_rows()), options());
    conv.connect().await.unwrap();
    conv
}

#[tokio::test]
async fn test_start_defaults_source_and_shows_menu() {
    let mut conv = connected().await;
    let actions = conv.handle_update(&text(1, "/start"), now()).await;

    assert_eq!(actions.len(), 1);
    let Action::Send { text, keyboard, .. } = &actions[0] else {
        panic!("expected a new message, got {actions:?}");
    };
    assert!(text.starts_with("Привет, Aziz!"));
    assert!(text.contains("Текущий источник: Humo UZS (Валюта: UZS)"));
    let kb = keyboard.as_ref().unwrap();
    assert_eq!(kb.inline_keyboard[0][0].callback_data, "cat_Еда");
    assert_eq!(kb.inline_keyboard[1][1].text, "Источник: Humo UZS");
    assert_eq!(conv.session(CHAT).unwrap().source.as_deref(), Some("Humo UZS"));
}

#[tokio::test]
async fn test_start_without_sources_asks_to_fill_sheet() {
    let mut conv = Conversation::new(MemoryLedger::default(), options());
    conv.connect().await.unwrap();
    let actions = conv.handle_update(&text(1, "/start"), now()).await;
    assert!(action_text(&actions[0]).contains("колонка F"));
}

#[tokio::test]
async fn test_manual_entry_flow() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;

    let actions = conv.handle_update(&press("cat_Еда"), now()).await;
    let Action::Edit { message_id, text: edit_text, keyboard, .. } = &actions[0] else {
        panic!("expected an edit");
    };
    assert_eq!(*message_id, MENU_MESSAGE);
    assert!(edit_text.contains("Категория: Еда"));
    assert_eq!(keyboard.as_ref().unwrap().inline_keyboard[0][0].callback_data, "sub_Кафе");

    let actions = conv.handle_update(&press("sub_Кафе"), now()).await;
    assert!(action_text(&actions[0]).ends_with("ВНЕСИТЕ СУММУ И КОММЕНТАРИЙ (ЧЕРЕЗ ПРОБЕЛ):"));

    let actions = conv.handle_update(&text(2, "45000,5 обед с коллегами"), now()).await;
    assert!(action_text(&actions[0]).starts_with("Данные успешно записаны."));
    assert!(action_text(&actions[0]).contains("Сумма: 45000.5 UZS"));

    let rows = conv.ledger().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date_cell(), "09.06.2024");
    assert_eq!(rows[0].category, "ЕДА");
    assert_eq!(rows[0].subcategory, "Кафе");
    assert_eq!(rows[0].amount, 45000.5);
    assert_eq!(rows[0].comment, "обед с коллегами");
    assert_eq!(rows[0].currency, "UZS");
    assert_eq!(rows[0].source, "Humo UZS");
    // header is row 1, so the first data row is row 2
    assert!(rows[0].balance_formula.contains("$D$2:D2;"));
}

#[tokio::test]
async fn test_manual_entry_lists_missing_selection() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    conv.handle_update(&press("cat_Еда"), now()).await;

    let actions = conv.handle_update(&text(2, "100 такси"), now()).await;
    let msg = action_text(&actions[0]);
    assert!(msg.starts_with("Пожалуйста, сначала выберите:\n- Подкатегорию"));
    assert!(conv.ledger().rows().is_empty());
}

#[tokio::test]
async fn test_manual_entry_bad_amount() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    conv.handle_update(&press("cat_Еда"), now()).await;
    conv.handle_update(&press("sub_Кафе"), now()).await;

    let actions = conv.handle_update(&text(2, "обед 45000"), now()).await;
    let Action::Send { text, keyboard, .. } = &actions[0] else {
        panic!("expected a new message, got {actions:?}");
    };
    assert!(text.starts_with("Неверный формат суммы."));
    let kb = keyboard.as_ref().unwrap();
    assert_eq!(kb.inline_keyboard[0][0].callback_data, "sub_Кафе");
    assert!(conv.ledger().rows().is_empty());
}

#[tokio::test]
async fn test_text_without_source_is_refused() {
    let mut conv = connected().await;
    let actions = conv.handle_update(&text(1, "100 обед"), now()).await;
    assert!(action_text(&actions[0]).starts_with("Ошибка: Источник не выбран."));
}

#[tokio::test]
async fn test_sms_import_flow() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;

    let actions = conv.handle_update(&press("sms"), now()).await;
    assert!(action_text(&actions[0]).ends_with("Вставьте скопированные СМС:"));
    assert!(conv.session(CHAT).unwrap().sms_mode);

    let pasted = "Pokupka: 15000,00 UZS 01.06.24 14:30 Karta *1234 Summa: 200000 UZS zachislenie 02-Jun-2024 09:00";
    let actions = conv.handle_update(&text(7, pasted), now()).await;

    assert_eq!(
        actions[0],
        Action::Delete {
            chat_id: CHAT,
            message_id: 7
        }
    );
    assert_eq!(
        action_text(&actions[1]),
        "Записаны 2 транзакций из СМС (Источник: Humo UZS, Валюта: UZS)."
    );
    assert!(!conv.session(CHAT).unwrap().sms_mode);

    let rows = conv.ledger().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].category, "РАСХОД");
    assert_eq!(rows[0].amount, 15000.0);
    assert_eq!(rows[0].date_cell(), "01.06.2024");
    assert_eq!(rows[0].comment, "SMS: UZS Pokupka: 15000,00 UZS 01.06.24...");
    assert_eq!(rows[1].category, "ДОХОД");
    assert!(rows[1].balance_formula.contains("$D$2:D3;"));
}

#[tokio::test]
async fn test_sms_nothing_recognized_leaves_sms_mode() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    conv.handle_update(&press("sms"), now()).await;

    let actions = conv.handle_update(&text(2, "привет, это не смс"), now()).await;
    assert_eq!(actions.len(), 2);
    assert!(action_text(&actions[0]).starts_with("Не удалось распознать транзакции"));
    assert!(!conv.session(CHAT).unwrap().sms_mode);
    assert!(conv.ledger().rows().is_empty());
}

#[tokio::test]
async fn test_sms_import_with_sheet_down_stays_in_sms_mode() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    conv.handle_update(&press("sms"), now()).await;

    conv.ledger_mut()
        .fail_next(2, LedgerError::Transport("connection refused".into()));
    let pasted = "Pokupka: 15000,00 UZS 01.06.24 14:30";
    let actions = conv.handle_update(&text(3, pasted), now()).await;

    assert_eq!(actions.len(), 1);
    assert_eq!(
        action_text(&actions[0]),
        "Ошибка при записи данных из СМС. Не удалось подключиться к таблице."
    );
    assert!(conv.session(CHAT).unwrap().sms_mode);
    assert!(conv.ledger().rows().is_empty());

    // the same paste goes through once the sheet is back
    let actions = conv.handle_update(&text(4, pasted), now()).await;
    assert!(action_text(&actions[1]).starts_with("Записаны 1 транзакций из СМС"));
    assert!(!conv.session(CHAT).unwrap().sms_mode);
}

#[tokio::test]
async fn test_change_source_resets_selection() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    conv.handle_update(&press("cat_Еда"), now()).await;

    let actions = conv.handle_update(&press("change_source"), now()).await;
    assert_eq!(action_text(&actions[0]), "Выберите источник:");

    let actions = conv.handle_update(&press("set_source_Visa USD"), now()).await;
    assert!(action_text(&actions[0]).starts_with("Источник 'Visa USD' выбран (Валюта: USD)."));
    let session = conv.session(CHAT).unwrap();
    assert_eq!(session.source.as_deref(), Some("Visa USD"));
    assert!(session.category.is_none());
}

#[tokio::test]
async fn test_reboot_reloads_catalog() {
    let mut conv = connected().await;
    conv.handle_update(&text(1, "/start"), now()).await;
    assert_eq!(conv.catalog().categories, vec!["Еда", "Транспорт"]);
    assert_eq!(conv.session(CHAT).unwrap().source.as_deref(), Some("Humo UZS"));

    // someone edits the system sheet: categories renamed, the Humo card removed
    let edited: Vec<Vec<String>> = [
        ["Категория", "Подкатегория", "", "", "", "Источник"],
        ["Дом", "Аренда", "", "", "", "Visa USD"],
        ["Связь", "Мобильный", "", "", "", ""],
    ]
    .iter()
    .map(|r| r.iter().map(|s| s.to_string()).collect())
    .collect();
    conv.ledger_mut().set_system_rows(edited);

    let actions = conv.handle_update(&text(2, "/reboot"), now()).await;
    assert_eq!(actions.len(), 2);
    assert!(action_text(&actions[0]).contains("успешно обновлены"));
    assert!(action_text(&actions[1]).starts_with("Привет, Aziz!"));
    assert!(action_text(&actions[1]).contains("Visa USD (Валюта: USD)"));

    let catalog = conv.catalog();
    assert_eq!(catalog.categories, vec!["Дом", "Связь"]);
    assert_eq!(catalog.sources, vec!["Visa USD"]);
    assert_eq!(conv.session(CHAT).unwrap().source.as_deref(), Some("Visa USD"));
}

#[tokio::test]
async fn test_transient_failure_during_connect_is_retried() {
    let mut ledger = MemoryLedger::new(system_rows());
    ledger.fail_next(1, LedgerError::Transport("connection reset".into()));
    let mut conv = Conversation::new(ledger, options());

    conv.connect().await.unwrap();
    // one reconnect to open, one more to recover the failed catalog read
    assert_eq!(conv.ledger().reconnects(), 2);
    assert_eq!(conv.catalog().sources, vec!["Humo UZS", "Visa USD"]);
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_catalog() {
    let mut ledger = MemoryLedger::new(system_rows());
    ledger.fail_reconnect(LedgerError::Auth("key revoked".into()));
    let mut conv = Conversation::new(ledger, options());

    assert!(conv.connect().await.is_err());
    assert!(conv.catalog().categories.is_empty());

    let actions = conv.handle_update(&text(1, "/reboot"), now()).await;
    assert_eq!(actions.len(), 2);
    assert_eq!(conv.catalog().categories, vec!["Еда", "Транспорт"]);
}
