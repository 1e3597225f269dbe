use pretty_assertions::assert_eq;
use std::io::Cursor;
use swatchtag::{
    image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage},
    BrandTable, CatalogService, CatalogStore, InMemoryCatalog, ItemId, TagQuery, Tagger,
};

fn png(image: RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A product shot: a grey backdrop with a colored block in the middle covering `share` of the width.
fn product_shot(color: [u8; 3], share: f32) -> Vec<u8> {
    let width = 160;
    let block = (width as f32 * share) as u32;
    let start = (width - block) / 2;

    png(RgbImage::from_fn(width, 160, |x, _| {
        if x >= start && x < start + block {
            Rgb(color)
        } else {
            Rgb([128, 128, 128])
        }
    }))
}

fn strings(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

fn ids(items: &[swatchtag::Item]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

fn service() -> CatalogService<InMemoryCatalog> {
    let brands = BrandTable::from_json_str(r#"{"brands": {"N1KE": "Nike"}}"#).unwrap();
    let tagger = Tagger::new(brands).describe_image(false);
    let service = CatalogService::new(InMemoryCatalog::new(), tagger);

    let shots = [
        ("red-hoodie", [220, 20, 20], 0.75, &["type_hoodie", "company_N1KE"][..]),
        ("blue-hoodie", [20, 20, 220], 0.75, &["type_hoodie", "company_adidas"][..]),
        ("red-tee", [220, 20, 20], 0.5, &["type_tee", "company_nike"][..]),
        ("red-hoodie-2", [220, 20, 20], 0.5, &["type_hoodie", "type_jacket", "company_nike"][..]),
    ];

    for (id, color, share, tags) in shots {
        service
            .tag_and_store(ItemId::new(id), &product_shot(color, share), &strings(tags))
            .unwrap();
    }

    service
}

#[test]
fn tagged_items_carry_colors_and_brands() {
    let service = service();
    let item = service.store().get(&ItemId::new("red-hoodie")).unwrap().unwrap();

    assert!(item.has_tag("color_red"));
    assert!(item.has_tag("color_grey"));
    assert!(item.has_tag("company_nike"));
    assert!(item.colors["red"] > item.colors["grey"]);

    let total: f64 = item.colors.values().sum();
    assert!((total - 100.0).abs() < 0.01);
}

#[test]
fn search_combines_categories() {
    let service = service();

    let red_hoodies = service
        .search(&TagQuery::new(["type_hoodie", "color_red"]))
        .unwrap();
    assert_eq!(ids(&red_hoodies), vec!["red-hoodie", "red-hoodie-2"]);

    let only_hoodies = service
        .search(&TagQuery::new(["type_hoodie"]).exclusive_type(true))
        .unwrap();
    assert_eq!(ids(&only_hoodies), vec!["red-hoodie", "blue-hoodie"]);

    let reddest = service
        .search(&TagQuery::new(["color_red", "color_blue"]).sort_by_colors(["red"]))
        .unwrap();
    assert_eq!(ids(&reddest)[0], "red-hoodie");
    assert_eq!(ids(&reddest).last(), Some(&"blue-hoodie"));
}

#[test]
fn similar_items_stay_within_type_and_brand() {
    let service = service();

    let similar = service
        .similar_by_color_scored(&ItemId::new("red-hoodie"), 10, false)
        .unwrap();
    assert_eq!(similar[0].0.id.as_str(), "red-hoodie");
    assert_eq!(similar[0].1, 0.0);
    assert_eq!(similar[1].0.id.as_str(), "red-hoodie-2");
    assert!(!similar.iter().any(|(item, _)| item.id.as_str() == "red-tee"));

    let same_brand = service
        .similar_by_color(&ItemId::new("red-hoodie"), 10, true)
        .unwrap();
    assert_eq!(ids(&same_brand), vec!["red-hoodie", "red-hoodie-2"]);
}

#[test]
fn adjusting_the_backdrop_keeps_every_item_at_100() {
    let service = service();

    let adjustment = service.adjust_colors(&strings(&["grey"])).unwrap();
    assert!(adjustment.averages["grey"] > 0.0);
    assert!(adjustment.items_updated > 0);

    for item in service.store().items().unwrap() {
        let total: f64 = item.colors.values().sum();
        assert!((total - 100.0).abs() < 0.01, "{} sums to {}", item.id, total);

        if !item.colors.contains_key("grey") {
            assert!(!item.has_tag("color_grey"));
        }
    }
}

#[test]
fn snapshot_round_trip_keeps_search_results() {
    let service = service();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");

    service.store().save_json(&path).unwrap();
    let reloaded = CatalogService::new(InMemoryCatalog::load_json(&path).unwrap(), Tagger::default());

    let query = TagQuery::new(["type_hoodie", "color_red"]);
    assert_eq!(
        ids(&reloaded.search(&query).unwrap()),
        ids(&service.search(&query).unwrap())
    );
}
