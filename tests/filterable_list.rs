use arenaview::loader;
use arenaview::{Field, Filter, FilterableList, PageSlot, Record, SortOrder, Value};

#[derive(Debug, Clone)]
struct Bot {
    name: String,
    race: String,
    elo: u32,
}

fn bots(count: usize) -> Vec<Option<Bot>> {
    let races = ["Protoss", "Terran", "Zerg"];
    (0..count)
        .map(|i| {
            Some(Bot {
                name: format!("Bot{i:02}"),
                race: races[i % 3].to_string(),
                elo: 1500 + i as u32,
            })
        })
        .collect()
}

fn bot_fields() -> Vec<Field<Bot>> {
    vec![
        Field::new("name", |b: &Bot| Some(b.name.clone())).with_label("Name"),
        Field::new("race", |b: &Bot| Some(b.race.clone())),
        Field::new("elo", |b: &Bot| Some(b.elo.to_string())),
    ]
}

fn bot_filters() -> Vec<Filter<Bot>> {
    vec![
        Filter::search_in("search", &["name"]),
        Filter::dropdown(Field::new("race", |b: &Bot| Some(b.race.clone()))),
    ]
}

fn names(list: &FilterableList<Bot>) -> Vec<String> {
    list.page_records().iter().map(|b| b.name.clone()).collect()
}

#[test]
fn twelve_records_five_per_page() {
    let list = FilterableList::new(bots(12), bot_fields(), bot_filters()).with_results_per_page(5);
    assert_eq!(list.total_pages(), 3);
    assert_eq!(list.current_page(), 1);
    assert_eq!(
        list.page_slots(),
        vec![PageSlot::Page(1), PageSlot::Page(2), PageSlot::Page(3)]
    );
    assert_eq!(names(&list), ["Bot00", "Bot01", "Bot02", "Bot03", "Bot04"]);
}

#[test]
fn search_narrows_to_one_page() {
    let mut list = FilterableList::new(bots(12), bot_fields(), bot_filters()).with_results_per_page(5);
    list.set_page(3);
    list.set_filter("search", "bot1[01]");
    assert_eq!(list.filtered_len(), 2);
    assert_eq!(list.current_page(), 1);
    assert_eq!(list.page_slots(), vec![PageSlot::Page(1)]);
    assert_eq!(names(&list), ["Bot10", "Bot11"]);
}

#[test]
fn filtering_clamps_the_current_page() {
    let mut list = FilterableList::new(bots(23), bot_fields(), bot_filters()).with_results_per_page(3);
    list.set_page(5);
    assert_eq!(list.current_page(), 5);
    // Bot00 .. Bot22, every third one is Protoss: 8 records
    list.set_filter("race", "protoss");
    assert_eq!(list.filtered_len(), 8);
    assert_eq!(list.total_pages(), 3);
    assert_eq!(list.current_page(), 3);

    list.set_results_per_page(4);
    assert_eq!(list.total_pages(), 2);
    assert_eq!(list.current_page(), 2);
}

#[test]
fn filter_on_last_page_clamps_to_new_last_page() {
    let mut list = FilterableList::new(bots(23), bot_fields(), bot_filters()).with_results_per_page(5);
    assert_eq!(list.total_pages(), 5);
    list.set_page(5);
    assert_eq!(list.current_page(), 5);
    list.set_filter("race", "protoss");
    assert_eq!(list.filtered_len(), 8);
    assert_eq!(list.total_pages(), 2);
    assert_eq!(list.current_page(), 2);
    assert_eq!(names(&list), ["Bot15", "Bot18", "Bot21"]);
}

#[test]
fn header_clicks_toggle_and_reset_order() {
    let mut list = FilterableList::new(bots(4), bot_fields(), bot_filters());
    list.sort_by_key("elo");
    assert_eq!(list.state().sort_order, SortOrder::Ascending);
    list.sort_by_key("elo");
    assert_eq!(list.state().sort_order, SortOrder::Descending);
    assert_eq!(names(&list)[0], "Bot03");

    list.sort_by_key("name");
    assert_eq!(list.state().sort_order, SortOrder::Ascending);
    assert_eq!(list.sort_field().map(|f| f.key()), Some("name"));
    assert_eq!(names(&list)[0], "Bot00");
}

#[test]
fn missing_nested_values_sort_last_both_ways() {
    let user = |name: Option<&str>| {
        Value::Map(vec![(
            "username".to_string(),
            name.map(Value::text).unwrap_or(Value::Null),
        )])
    };
    let data = vec![
        Some(Record::new().with("bot", Value::text("Orphan")).with("user", user(None))),
        Some(Record::new().with("bot", Value::text("Banshee")).with("user", user(Some("bob")))),
        None,
        Some(Record::new().with("bot", Value::text("Aeolus")).with("user", user(Some("alice")))),
    ];
    let mut list = FilterableList::new(
        data,
        vec![Field::path("bot"), Field::path("user.username")],
        vec![Filter::search("search")],
    );
    let owners = |list: &FilterableList<Record>| {
        list.page_records()
            .iter()
            .map(|r| list.fields()[1].display(r))
            .collect::<Vec<_>>()
    };

    assert_eq!(list.filtered_len(), 3);
    list.sort_by_key("user.username");
    assert_eq!(owners(&list), ["alice", "bob", ""]);
    list.sort_by_key("user.username");
    assert_eq!(owners(&list), ["bob", "alice", ""]);

    list.set_filter("search", "orphan");
    assert_eq!(list.filtered_len(), 1);
    list.set_filter("search", "ali");
    assert_eq!(owners(&list), ["alice"]);
}

#[test]
fn descending_reverses_ascending_for_distinct_keys() {
    let mut list = FilterableList::new(bots(17), bot_fields(), bot_filters()).with_results_per_page(100);
    list.sort_by_key("elo");
    let ascending = names(&list);
    list.sort_by_key("elo");
    let mut descending = names(&list);
    descending.reverse();
    assert_eq!(ascending, descending);
}

#[test]
fn repeated_filter_is_idempotent() {
    let mut list = FilterableList::new(bots(30), bot_fields(), bot_filters()).with_results_per_page(4);
    list.set_filter("race", "Zerg");
    list.set_page(2);
    let once = (names(&list), list.current_page(), list.total_pages());
    list.set_filter("race", "Zerg");
    let twice = (names(&list), list.current_page(), list.total_pages());
    assert_eq!(once, twice);
}

#[test]
fn page_always_within_bounds() {
    let mut list = FilterableList::new(bots(50), bot_fields(), bot_filters()).with_results_per_page(7);
    for page in [0, 1, 4, 8, 99] {
        list.set_page(page);
        let total = list.total_pages();
        assert!(list.current_page() >= 1 && list.current_page() <= total.max(1));
        assert!(list.page_records().len() <= list.results_per_page());
    }
    list.set_filter("search", "nothing matches this");
    assert_eq!(list.filtered_len(), 0);
    assert_eq!(list.total_pages(), 0);
    assert_eq!(list.current_page(), 1);
    assert!(list.page_slots().is_empty());
}

#[test]
fn render_pads_rows_and_passes_absolute_index() {
    let mut list = FilterableList::new(bots(7), bot_fields(), bot_filters()).with_results_per_page(5);
    list.last_page();
    let view = list.render(&|bot: &Bot, idx: usize| format!("{idx}:{}", bot.name));
    assert_eq!(view.rows.len(), 5);
    assert_eq!(view.rows[0].as_deref(), Some("5:Bot05"));
    assert_eq!(view.rows[1].as_deref(), Some("6:Bot06"));
    assert!(view.rows[2..].iter().all(Option::is_none));
    assert!(view.filter_controls.is_none());
    assert!(view.pagination.has_previous && !view.pagination.has_next);
    assert_eq!(view.headers[0].label, "Name");
    assert_eq!(view.headers[0].sorted, Some(SortOrder::Ascending));
}

#[test]
fn csv_fixture_through_the_list() {
    let dataset = loader::load("tests/fixtures/bots.csv".into()).expect("fixture loads");
    let fields = dataset.paths.iter().map(|p| Field::path(p)).collect();
    let mut list = FilterableList::new(
        dataset.records,
        fields,
        vec![Filter::search("search"), Filter::dropdown(Field::path("race"))],
    )
    .with_results_per_page(5);
    assert_eq!(list.filtered_len(), 12);
    assert_eq!(list.total_pages(), 3);
    assert!(list.dropdown_options("race").iter().any(|r| r == "Protoss"));

    list.set_filter("search", "aeolus");
    assert_eq!(list.filtered_len(), 1);
}
