#![no_main]

use libfuzzer_sys::fuzz_target;
use protolens::{
    proto::{FileDescriptorProto, SchemaMessage},
    FileBuilder, Registry,
};

fuzz_target!(|data: &[u8]| {
    let _ = FileDescriptorProto::decode(data);

    let registry = Registry::new();
    if let Ok(handle) = registry.register_raw_file(FileBuilder::new(data.to_vec())) {
        let _ = handle.descriptor();
    }
});
