#![no_main]
use libfuzzer_sys::fuzz_target;
use ntfs_mft::{NtfsIndexRecord, NtfsMftRecord, NtfsStructuredValue};

fuzz_target!(|data: &[u8]| {
    let mut record_data = data.to_vec();
    if let Ok(mft_record) = NtfsMftRecord::new(&mut record_data, 0) {
        for attribute in mft_record.attributes() {
            match attribute.structured_value() {
                Ok(NtfsStructuredValue::AttributeList(list)) => list.entries().for_each(drop),
                Ok(NtfsStructuredValue::IndexRoot(index_root)) => {
                    index_root.entries().for_each(drop)
                }
                Ok(NtfsStructuredValue::NonResident(data_runs)) => data_runs.for_each(drop),
                _ => (),
            }
        }
    }

    let mut index_data = data.to_vec();
    if let Ok(index_record) = NtfsIndexRecord::new(&mut index_data, 0) {
        for entry in index_record.entries().flatten() {
            let _ = entry.key_file_name();
        }
    }
});
