use json_products::{Commit, ProductStore, Record};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join("products_example_basic.json");
    let _ = std::fs::remove_file(&path);
    let store = ProductStore::open(&path)?;

    // create
    for (name, price) in [("Lamp", 20), ("Desk", 140), ("Chair", 65)] {
        store.transact(|records| {
            let mut p = Record::new();
            p.insert("name", name);
            p.insert("price", price);
            p.set_id(store.next_id(records));
            records.push(p);
            Commit::Save(())
        });
    }

    // patch
    let patch = Record::from_json(br#"{"price": 18}"#)?;
    let lamp = store.transact(|records| match ProductStore::find(records, 1) {
        Some(i) => {
            records[i].merge(patch);
            Commit::Save(Some(records[i].clone()))
        }
        None => Commit::Skip(None),
    });
    println!("lamp after patch = {lamp:?}");

    // delete
    store.transact(|records| {
        let removed = ProductStore::find(records, 2).map(|i| records.remove(i));
        println!("removed = {removed:?}");
        Commit::Save(())
    });

    // the file on disk is indented JSON
    let contents = std::fs::read_to_string(store.path())?;
    println!("On-disk JSON:\n{contents}");
    println!("next id = {}", store.next_id(&store.load()));

    let _ = std::fs::remove_file(&path);
    Ok(())
}
