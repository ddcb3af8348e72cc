use vtc_blockindexer::errors::IndexerError;
use vtc_blockindexer::index::{get_balance, get_txos};
use vtc_blockindexer::runtime::mdb::Mdb;
use vtc_blockindexer::runtime::store::{KvRead, KvStore};
use vtc_blockindexer::test_utils::{IndexFixture, IndexSink, MemStore, TempDir, hash};

/// Three outputs over two blocks, the middle one spent.
fn populate<S: IndexSink + ?Sized>(sink: &S) {
    IndexFixture::new(sink)
        .add_txo("Vq", &hash('1'), 0, 10, 1_000)
        .add_txo("Vq", &hash('2'), 3, 11, 20_000)
        .add_txo("Vq", &hash('3'), 1, 12, 300)
        .add_txo("Vqx", &hash('4'), 0, 12, 5)
        .spend(&hash('2'), 3, &hash('9'));
}

fn check_queries(view: &dyn KvRead) {
    assert_eq!(get_balance(view, "Vq").unwrap(), 1_300);
    assert_eq!(get_balance(view, "Vqx").unwrap(), 5);
    assert_eq!(get_balance(view, "V").unwrap(), 0);

    let all = get_txos(view, "Vq", 0).unwrap();
    let hashes: Vec<_> = all.iter().map(|t| t.txhash.clone()).collect();
    assert_eq!(hashes, vec![hash('1'), hash('2'), hash('3')]);
    assert_eq!(all[1].spender.as_deref(), Some(hash('9').as_str()));
    assert_eq!(all[0].spender, None);
    assert_eq!(all[1].vout, 3);
}

#[test]
fn queries_over_mem_store() {
    let store = MemStore::new();
    populate(&store);
    check_queries(&store);
    check_queries(store.read_view().as_ref());
}

#[test]
fn queries_over_rocksdb_snapshot() {
    let dir = TempDir::new().unwrap();
    let mdb = Mdb::open(dir.path(), false).unwrap();
    populate(&mdb);
    check_queries(mdb.read_view().as_ref());
}

#[test]
fn queries_over_read_only_rocksdb() {
    let dir = TempDir::new().unwrap();
    {
        let mdb = Mdb::open(dir.path(), false).unwrap();
        populate(&mdb);
    }
    let ro = Mdb::open_read_only(dir.path(), false).unwrap();
    check_queries(&ro);
}

#[test]
fn documented_record_example() {
    let store = MemStore::new();
    let record = format!("{}{}{}{}", "aa".repeat(32), "00000003", "00012345", "500000");
    store.insert(b"Vxyz-txo-00000001".to_vec(), record.into_bytes());

    assert_eq!(get_balance(&store, "Vxyz").unwrap(), 500_000);
    let txos = get_txos(&store, "Vxyz", 0).unwrap();
    assert_eq!(
        serde_json::to_value(&txos).unwrap(),
        serde_json::json!([{
            "txhash": "aa".repeat(32),
            "vout": 3,
            "block": 12345,
            "value": 500000,
            "spender": null
        }])
    );

    let mut marker = vec![b'0'; 64];
    marker.extend_from_slice("bb".repeat(32).as_bytes());
    store.insert(
        format!("txo-{}-00000003-spent", "aa".repeat(32)).into_bytes(),
        marker,
    );
    assert_eq!(get_balance(&store, "Vxyz").unwrap(), 0);
    assert_eq!(
        get_txos(&store, "Vxyz", 0).unwrap()[0].spender.as_deref(),
        Some("bb".repeat(32).as_str())
    );
}

#[test]
fn balance_is_sum_of_unspent() {
    let store = MemStore::new();
    let mut fx = IndexFixture::new(&store);
    let values = [5u64, 70, 900, 12_000, 1];
    for (i, v) in values.iter().enumerate() {
        fx.add_txo("Vsum", &hash(char::from(b'a' + i as u8)), i as u64, 100 + i as u64, *v);
    }
    assert_eq!(get_balance(&store, "Vsum").unwrap(), values.iter().sum::<u64>());

    fx.spend(&hash('c'), 2, &hash('f'));
    assert_eq!(get_balance(&store, "Vsum").unwrap(), values.iter().sum::<u64>() - 900);

    let unspent: u64 = get_txos(&store, "Vsum", 0)
        .unwrap()
        .iter()
        .filter(|t| t.spender.is_none())
        .map(|t| t.value)
        .sum();
    assert_eq!(unspent, get_balance(&store, "Vsum").unwrap());
}

#[test]
fn since_filter_is_ordered_subset() {
    let store = MemStore::new();
    let mut fx = IndexFixture::new(&store);
    // creation order is not height order
    for (i, height) in [50u64, 10, 30, 30, 70, 20].iter().enumerate() {
        fx.add_txo("Vs", &hash(char::from(b'0' + i as u8)), 0, *height, 1);
    }

    let all = get_txos(&store, "Vs", 0).unwrap();
    assert_eq!(all.len(), 6);
    for h in [0u64, 10, 11, 30, 70, 71, u64::MAX] {
        let since = get_txos(&store, "Vs", h).unwrap();
        let expected: Vec<_> = all.iter().filter(|t| t.block >= h).cloned().collect();
        assert_eq!(since, expected, "since {h}");
    }
}

#[test]
fn scan_failure_is_an_error_not_a_zero() {
    let store = MemStore::new();
    populate(&store);
    store.fail_scans(true);
    assert!(matches!(get_balance(&store, "Vq"), Err(IndexerError::StoreScan(_))));
    assert!(matches!(get_txos(&store, "Vq", 0), Err(IndexerError::StoreScan(_))));
}
