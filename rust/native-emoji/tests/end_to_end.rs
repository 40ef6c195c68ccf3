use emoji_dom::{parse_html, SelectorList};
use native_emoji::{scan, Page};
use pretty_assertions::assert_eq;

fn count(page: &Page, selector: &str) -> usize {
    let selectors = SelectorList::parse(selector).unwrap();
    let document = page.document();
    document.query_selector_all(document.root(), &selectors).len()
}

#[test]
fn test_grinning_face_is_replaced_on_load() {
    let page = Page::load(r#"<p>hi <img class="emoji" alt="grinning face 😀" height="32"></p>"#);

    assert_eq!(
        page.to_html(),
        concat!(
            r#"<p>hi <span class="native-emoji-replacement native-emoji-replaced" aria-hidden="false" "#,
            r#"aria-label="grinning face 😀" style="font-size: 24px; line-height: 32px; "#,
            r#"display: inline-block; vertical-align: baseline; margin: 0px; padding: 0px;">😀</span></p>"#,
        )
    );
}

#[test]
fn test_empty_alt_is_left_alone() {
    let source = r#"<p><img class="emoji" alt=""></p>"#;
    let page = Page::load(source);

    assert_eq!(page.to_html(), source);
}

#[test]
fn test_stylesheet_layout_is_carried_over() {
    let page = Page::load(concat!(
        "<style>.chat img.emoji { height: 22px; vertical-align: middle; margin: 0 2px; display: block }</style>",
        r#"<div class="chat"><img class="emoji" alt="🙂"></div>"#,
    ));
    let span = page
        .document()
        .query_selector(
            page.document().root(),
            &SelectorList::parse(".native-emoji-replacement").unwrap(),
        )
        .unwrap();
    let style = |name| page.document().style_property(span, name).unwrap();

    assert_eq!(style("font-size"), "17px");
    assert_eq!(style("line-height"), "22px");
    assert_eq!(style("display"), "block");
    assert_eq!(style("vertical-align"), "middle");
    assert_eq!(style("margin"), "0px 2px");
    assert_eq!(style("padding"), "0px");
}

#[test]
fn test_bulk_container_insert() {
    let mut page = Page::load(r#"<div id="log"></div>"#);
    let document = page.document_mut();
    let log = document.children(document.root())[0];

    let container = document.parse_fragment(concat!(
        r#"<div class="message">"#,
        r#"<img class="emoji" alt="😀"> <img class="emoji" alt="🎉"> <img class="emoji" alt="👍">"#,
        r#"</div>"#,
    ))[0];
    document.append_child(log, container).unwrap();

    assert_eq!(page.run_until_idle(), 3);
    assert_eq!(count(&page, "img"), 0);
    assert_eq!(count(&page, ".native-emoji-replaced"), 3);
    assert_eq!(page.document().text_content(container), "😀 🎉 👍");

    assert_eq!(page.run_until_idle(), 0);
    assert_eq!(count(&page, ".native-emoji-replaced"), 3);
}

#[test]
fn test_image_becomes_emoji_later() {
    let mut page = Page::load(r#"<p><img id="late" src="party.png"></p>"#);
    assert_eq!(count(&page, "img"), 1);

    let document = page.document_mut();
    let img = document
        .query_selector(document.root(), &SelectorList::parse("#late").unwrap())
        .unwrap();
    document.add_class(img, "emoji").unwrap();
    document.set_attribute(img, "alt", "🎉").unwrap();

    assert_eq!(page.run_until_idle(), 1);
    assert_eq!(count(&page, "img"), 0);
    assert_eq!(
        page.to_html(),
        concat!(
            r#"<p><span class="native-emoji-replacement native-emoji-replaced" aria-hidden="false" "#,
            r#"aria-label="🎉" style="font-size: 1em; line-height: 0px; display: inline-block; "#,
            r#"vertical-align: baseline; margin: 0px; padding: 0px;">🎉</span></p>"#,
        )
    );
}

#[test]
fn test_rescan_is_idempotent() {
    let mut document = parse_html(concat!(
        r#"<img class="emoji" alt="😀 smile">"#,
        r#"<img class="emoji" alt="plain">"#,
        r#"<span class="native-emoji-replaced">🙂</span>"#,
    ));
    assert_eq!(scan(&mut document, None), 1);
    let once = document.to_html();

    assert_eq!(scan(&mut document, None), 0);
    assert_eq!(document.to_html(), once);
}

#[test]
fn test_unloaded_page_keeps_images() {
    let mut page = Page::load("<main></main>");
    page.unload();

    let document = page.document_mut();
    let main = document.children(document.root())[0];
    document
        .set_inner_html(main, r#"<img class="emoji" alt="😀">"#)
        .unwrap();

    assert_eq!(page.run_until_idle(), 0);
    assert_eq!(count(&page, "img.emoji"), 1);
}

#[test]
fn test_message_churn_reuses_node_slots() {
    let mut page = Page::load("<main></main>");
    let main = page.document().children(page.document().root())[0];
    let mut peak = 0;

    for round in 0..2000 {
        page.document_mut()
            .set_inner_html(main, r#"<p><img class="emoji" alt="😀"> hi</p>"#)
            .unwrap();
        assert_eq!(page.run_until_idle(), 1);
        if round == 10 {
            peak = page.document().slot_count();
        }
    }

    // root, main, p, span, span text, " hi"
    assert_eq!(page.document().len(), 6);
    assert!(page.document().slot_count() <= peak);
}
