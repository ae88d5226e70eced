#![no_main]
use libfuzzer_sys::fuzz_target;
use node_field::{MemoryStore, NodeField};

fuzz_target!(|data: &[u8]| {
    let field: NodeField<()> = NodeField::builder(MemoryStore::new()).strict(true).build();
    let node = field.decode(data);
    if node.id().is_none() {
        // Anything without a pointer must be readable without touching the store.
        let _ = node.len().expect("unpointed node must be readable");
    }
});
