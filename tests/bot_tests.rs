//! Browsing, callback routing, admin commands and the channel digest

mod common;

use chrono::{Duration, TimeZone};
use serde_json::json;
use teloxide::types::{ChatId, MessageId, ReplyMarkup};

use common::*;
use dairybot::bot::{broadcast_digest, handle_callback, handle_channel_post, handle_text};
use dairybot::catalog::{Article, Catalog};
use dairybot::content::SERVICES_KEY;
use dairybot::digest::{build_digest, msk, DigestItem, DigestStore, DIGEST_KEY};
use dairybot::leads::{Lead, Leads};
use dairybot::subscribers::Subscribers;
use dairybot::token::BROWSE_TOKENS;

async fn seed_catalog(bot: &TestBot) {
    let catalog = Catalog::new(&bot.ctx.store);
    for (title, text) in [("Первая", "Раз"), ("Вторая", "Два"), ("Третья", "Три")] {
        catalog
            .append("Маститы", Article::new(title, text))
            .await
            .unwrap();
    }
}

async fn press_on(bot: &TestBot, message_id: Option<MessageId>, data: &str) {
    let user = user();
    handle_callback(&bot.ctx, &user, chat_of(&user), message_id, "cb-7", data)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_symptoms_with_empty_catalog() {
    let bot = test_bot();
    let user = user();

    handle_text(&bot.ctx, &user, chat_of(&user), "Симптомы и решения")
        .await
        .unwrap();

    let (text, markup) = bot.gateway.last_sent(chat_of(&user)).unwrap();
    assert_eq!(text, "Пока нет материалов в разделе «Симптомы и решения».");
    assert!(matches!(markup, Some(ReplyMarkup::Keyboard(_))));
    assert!(inline_data(&markup).is_empty());
}

#[tokio::test]
async fn test_browse_category_and_navigate_in_place() {
    let bot = test_bot();
    let user = user();
    seed_catalog(&bot).await;

    handle_text(&bot.ctx, &user, chat_of(&user), "Симптомы и решения")
        .await
        .unwrap();
    let (_, markup) = bot.gateway.last_sent(chat_of(&user)).unwrap();
    let token = BROWSE_TOKENS.encode("Маститы");
    assert_eq!(
        inline_data(&markup),
        vec![format!("symcat:{token}"), "symcat:__menu__".to_string()]
    );

    press_on(&bot, Some(MessageId(40)), &format!("symcat:{token}")).await;
    let (card, markup) = bot.gateway.last_sent(chat_of(&user)).unwrap();
    assert_eq!(card, "<b>Первая</b> (1/3)\n\nРаз");
    assert_eq!(inline_data(&markup)[0], format!("sym:item:{token}:1"));

    bot.gateway.reset();
    press_on(&bot, Some(MessageId(40)), &format!("sym:item:{token}:1")).await;

    assert_eq!(bot.gateway.acks(), vec![("cb-7".to_string(), None)]);
    assert_eq!(bot.gateway.sends(), 0);
    assert_eq!(
        bot.gateway.edits(),
        vec![(MessageId(40), "<b>Вторая</b> (2/3)\n\nДва".to_string())]
    );
}

#[tokio::test]
async fn test_navigate_falls_back_to_new_message() {
    let bot = test_bot();
    seed_catalog(&bot).await;
    bot.gateway.fail_edits();

    let token = BROWSE_TOKENS.encode("Маститы");
    press_on(&bot, Some(MessageId(40)), &format!("sym:item:{token}:2")).await;

    assert!(bot.gateway.edits().is_empty());
    let (card, _) = bot.gateway.last_sent(chat_of(&user())).unwrap();
    assert_eq!(card, "<b>Третья</b> (3/3)\n\nТри");
}

#[tokio::test]
async fn test_navigate_out_of_range_shows_toast() {
    let bot = test_bot();
    seed_catalog(&bot).await;

    let token = BROWSE_TOKENS.encode("Маститы");
    press_on(&bot, Some(MessageId(40)), &format!("sym:item:{token}:9")).await;

    assert_eq!(
        bot.gateway.acks(),
        vec![("cb-7".to_string(), Some("Карточка не найдена".to_string()))]
    );
    assert_eq!(bot.gateway.sends(), 0);
    assert!(bot.gateway.edits().is_empty());
}

#[tokio::test]
async fn test_stale_browse_token() {
    let bot = test_bot();
    seed_catalog(&bot).await;
    let stale = BROWSE_TOKENS.encode("Удалённая категория");

    press_on(&bot, Some(MessageId(40)), &format!("sym:item:{stale}:0")).await;

    assert_eq!(bot.gateway.acks(), vec![("cb-7".to_string(), None)]);
    assert_eq!(
        bot.gateway.texts_to(chat_of(&user())),
        vec!["Категория не найдена. Откройте раздел заново."]
    );
}

#[tokio::test]
async fn test_malformed_callback_gets_single_toast() {
    let bot = test_bot();
    seed_catalog(&bot).await;

    press_on(&bot, Some(MessageId(40)), "sym:item:abc").await;

    assert_eq!(
        bot.gateway.acks(),
        vec![("cb-7".to_string(), Some("Ошибка навигации".to_string()))]
    );
    assert_eq!(bot.gateway.sends(), 0);
}

#[tokio::test]
async fn test_unknown_namespace_is_ignored() {
    let bot = test_bot();

    press_on(&bot, None, "weather:today").await;
    press_on(&bot, None, "garbage").await;

    assert!(bot.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_start_subscribes_user() {
    let bot = test_bot();
    let user = user();

    handle_text(&bot.ctx, &user, chat_of(&user), "/start").await.unwrap();
    handle_text(&bot.ctx, &user, chat_of(&user), "/start").await.unwrap();

    assert_eq!(Subscribers::new(&bot.ctx.store).list().unwrap(), vec![USER_ID]);
    let (welcome, markup) = bot.gateway.last_sent(chat_of(&user)).unwrap();
    assert!(welcome.starts_with("Здравствуйте!"));
    assert!(matches!(markup, Some(ReplyMarkup::Keyboard(_))));
}

#[tokio::test]
async fn test_support_services_list_complex_first() {
    let bot = test_bot();
    bot.ctx
        .store
        .save(
            SERVICES_KEY,
            &json!({"services": [
                {"id": "audit_1", "group": "audit", "name": "Аудит кормления"},
                {"id": "support_a", "group": "specialized_service", "name": "Агроном"},
                {"id": "support_complex", "group": "specialized_service", "name": "Комплексное сопровождение"},
                {"id": "", "group": "specialized_service", "name": "Без id"}
            ]}),
        )
        .unwrap();

    press_on(&bot, None, "svcgrp:support").await;

    let (prompt, markup) = bot.gateway.last_sent(chat_of(&user())).unwrap();
    assert!(prompt.starts_with("Выберите формат сопровождения:"));
    assert_eq!(
        inline_data(&markup),
        vec!["svc:support_complex", "svc:support_a", "svcgrp:back", "svcgrp:menu"]
    );
}

#[tokio::test]
async fn test_service_card_offers_lead() {
    let bot = test_bot();
    bot.ctx
        .store
        .save(
            SERVICES_KEY,
            &json!({"services": [{
                "id": "audit_1",
                "group": "audit",
                "name": "Аудит кормления",
                "short": "Проверим рацион",
                "includes": ["Выезд на ферму", " "]
            }]}),
        )
        .unwrap();

    press_on(&bot, None, "svc:audit_1").await;

    let texts = bot.gateway.texts_to(chat_of(&user()));
    assert_eq!(texts.len(), 2);
    assert_eq!(
        texts[0],
        "<b>Аудит кормления</b>\n\nПроверим рацион\n\n<b>Что входит:</b>\n• Выезд на ферму"
    );
    let (_, markup) = bot.gateway.last_sent(chat_of(&user())).unwrap();
    assert_eq!(inline_data(&markup), vec!["lead:service:audit_1"]);
}

#[tokio::test]
async fn test_malformed_catalog_reports_unavailable() {
    let bot = test_bot();
    std::fs::write(bot.dir.path().join("symptoms.json"), "{not json").unwrap();

    handle_text(&bot.ctx, &user(), chat_of(&user()), "Симптомы и решения")
        .await
        .unwrap();

    assert_eq!(
        bot.gateway.texts_to(chat_of(&user())),
        vec!["⚠️ Данные временно недоступны. Попробуйте позже."]
    );
}

#[tokio::test]
async fn test_channel_posts_feed_digest() {
    let bot = test_bot();
    let channel = ChatId(CHANNEL_ID);

    handle_channel_post(&bot.ctx, channel, MessageId(17), Some("Итоги конференции\nПодробности"))
        .await
        .unwrap();
    handle_channel_post(&bot.ctx, channel, MessageId(17), Some("Итоги конференции"))
        .await
        .unwrap();
    handle_channel_post(&bot.ctx, channel, MessageId(18), Some("   "))
        .await
        .unwrap();
    handle_channel_post(&bot.ctx, ChatId(-100999), MessageId(19), Some("Чужой канал"))
        .await
        .unwrap();

    let items = DigestStore::new(&bot.ctx.store).items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].message_id, 17);
    assert_eq!(items[0].title, "Итоги конференции");
    assert_eq!(items[0].link, "https://t.me/unionpmo/17");
    assert!(bot.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_broadcast_counts_failures_and_clears_items() {
    let bot = test_bot();
    let now = msk().with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let store = DigestStore::new(&bot.ctx.store);
    store
        .record_post(5, "Новости отрасли", "unionpmo", now - Duration::days(1))
        .await
        .unwrap();
    let digest = store.build(now, 20).unwrap();

    bot.gateway.fail_for(ChatId(22));
    let report = broadcast_digest(&bot.ctx, &[11, 22, 33], &digest).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.items, 1);
    assert!(report.cleared);
    assert!(store.items().unwrap().is_empty());

    let delivered = bot.gateway.texts_to(ChatId(11));
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("Новости отрасли"));
    assert_eq!(bot.gateway.texts_to(ChatId(33)), delivered);
}

#[tokio::test]
async fn test_broadcast_keeps_counts_when_clear_fails() {
    let bot = test_bot();
    let now = msk().with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let item = DigestItem {
        ts: (now - Duration::hours(2)).to_rfc3339(),
        message_id: 9,
        title: "Семинар".to_string(),
        link: "https://t.me/unionpmo/9".to_string(),
    };
    let digest = build_digest(&[item], now, 20);

    // A directory in place of the document makes the final rename fail
    let blocked = bot.ctx.store.path_for(DIGEST_KEY);
    std::fs::create_dir_all(blocked.join("occupied")).unwrap();

    let report = broadcast_digest(&bot.ctx, &[11, 33], &digest).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(report.items, 1);
    assert!(!report.cleared);
    assert!(bot.gateway.texts_to(ChatId(11))[0].contains("Семинар"));
}

#[tokio::test]
async fn test_broadcast_command_without_subscribers() {
    let bot = test_bot();
    let admin = admin();
    DigestStore::new(&bot.ctx.store)
        .record_post(5, "Новости", "unionpmo", dairybot::digest::msk_now())
        .await
        .unwrap();

    handle_text(&bot.ctx, &admin, chat_of(&admin), "/digest_broadcast")
        .await
        .unwrap();

    assert_eq!(
        bot.gateway.texts_to(chat_of(&admin)),
        vec!["Пока нет подписчиков (никто не нажал /start)."]
    );
    assert_eq!(DigestStore::new(&bot.ctx.store).items().unwrap().len(), 1);
}

#[tokio::test]
async fn test_broadcast_command_reports_totals() {
    let bot = test_bot();
    let admin = admin();
    let user = user();
    handle_text(&bot.ctx, &user, chat_of(&user), "/start").await.unwrap();
    bot.gateway.reset();

    handle_text(&bot.ctx, &admin, chat_of(&admin), "/digest_broadcast")
        .await
        .unwrap();

    let report = bot.gateway.texts_to(chat_of(&admin));
    assert_eq!(report[0], "🚀 Начинаю рассылку. Получателей: 1");
    assert!(report[1].contains("Доставлено: 1\nОшибок: 0"));
    assert!(report[1].ends_with("Хранилище очищено."));
    let digest = bot.gateway.texts_to(chat_of(&user));
    assert!(digest[0].contains("За последние 7 дней публикаций не было."));
}

#[tokio::test]
async fn test_list_leads_newest_first() {
    let bot = test_bot();
    let admin = admin();
    let leads = Leads::new(&bot.ctx.store);
    for (i, contact) in ["первый", "второй", "третий"].into_iter().enumerate() {
        leads
            .append(Lead {
                ts: format!("2026-01-0{}T10:00:00+03:00", i + 1),
                user_id: 500 + i as u64,
                username: None,
                name: "Фермер".to_string(),
                contact_text: contact.to_string(),
                source: None,
            })
            .await
            .unwrap();
    }

    handle_text(&bot.ctx, &admin, chat_of(&admin), "/list_leads 2")
        .await
        .unwrap();

    let (text, _) = bot.gateway.last_sent(chat_of(&admin)).unwrap();
    assert!(text.starts_with("<b>Последние заявки</b>"));
    assert!(text.contains("<b>1)</b> <i>2026-01-03T10:00:00+03:00</i>"));
    assert!(text.contains("третий"));
    assert!(text.contains("второй"));
    assert!(!text.contains("первый"));

    handle_text(&bot.ctx, &admin, chat_of(&admin), "/clear_leads")
        .await
        .unwrap();
    assert!(leads.recent(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_commands_ignored_for_users() {
    let bot = test_bot();
    let user = user();

    for command in ["/admin", "/list_leads", "/digest_status", "/digest_clear"] {
        handle_text(&bot.ctx, &user, chat_of(&user), command).await.unwrap();
    }

    assert!(bot.gateway.calls().is_empty());
}
