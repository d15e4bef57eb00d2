//! FunctionFS descriptor and string blobs (spec.md §6), built once at
//! startup and written to ep0 before the UDC is bound.

use packed_struct::prelude::*;

use crate::ds3;

const FUNCTIONFS_DESCRIPTORS_MAGIC_V2: u32 = 0x3;
const FUNCTIONFS_HAS_FS_DESC: u32 = 0x1;
const FUNCTIONFS_HAS_HS_DESC: u32 = 0x2;
const FUNCTIONFS_STRINGS_MAGIC: u32 = 0x2;

const USB_DT_INTERFACE: u8 = 0x04;
const USB_DT_ENDPOINT: u8 = 0x05;
const USB_ENDPOINT_XFER_INT: u8 = 0x03;

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(endian = "lsb", size_bytes = "12")]
struct DescsHeaderV2 {
    #[packed_field(bytes = "0..=3")]
    magic: u32,
    #[packed_field(bytes = "4..=7")]
    length: u32,
    #[packed_field(bytes = "8..=11")]
    flags: u32,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(endian = "lsb", size_bytes = "9")]
struct InterfaceDescriptor {
    #[packed_field(bytes = "0")]
    length: u8,
    #[packed_field(bytes = "1")]
    descriptor_type: u8,
    #[packed_field(bytes = "2")]
    interface_number: u8,
    #[packed_field(bytes = "3")]
    alternate_setting: u8,
    #[packed_field(bytes = "4")]
    num_endpoints: u8,
    #[packed_field(bytes = "5")]
    interface_class: u8,
    #[packed_field(bytes = "6")]
    interface_subclass: u8,
    #[packed_field(bytes = "7")]
    interface_protocol: u8,
    #[packed_field(bytes = "8")]
    interface_string_index: u8,
}

impl InterfaceDescriptor {
    fn hid() -> Self {
        Self {
            length: 9,
            descriptor_type: USB_DT_INTERFACE,
            interface_number: 0,
            alternate_setting: 0,
            num_endpoints: 2,
            interface_class: 0x03, // HID
            interface_subclass: 0x00,
            interface_protocol: 0x00,
            interface_string_index: 1,
        }
    }
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(endian = "lsb", size_bytes = "7")]
struct EndpointDescriptor {
    #[packed_field(bytes = "0")]
    length: u8,
    #[packed_field(bytes = "1")]
    descriptor_type: u8,
    #[packed_field(bytes = "2")]
    endpoint_address: u8,
    #[packed_field(bytes = "3")]
    attributes: u8,
    #[packed_field(bytes = "4..=5")]
    max_packet_size: u16,
    #[packed_field(bytes = "6")]
    interval: u8,
}

impl EndpointDescriptor {
    fn interrupt(address: u8) -> Self {
        Self {
            length: 7,
            descriptor_type: USB_DT_ENDPOINT,
            endpoint_address: address,
            attributes: USB_ENDPOINT_XFER_INT,
            max_packet_size: ds3::EP_MAX_PACKET_SIZE,
            interval: ds3::EP_INTERVAL,
        }
    }
}

fn speed_triple() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(9 + 7 + 7);
    bytes.extend_from_slice(&InterfaceDescriptor::hid().pack().unwrap());
    bytes.extend_from_slice(&EndpointDescriptor::interrupt(ds3::EP_IN_ADDRESS).pack().unwrap());
    bytes.extend_from_slice(&EndpointDescriptor::interrupt(ds3::EP_OUT_ADDRESS).pack().unwrap());
    bytes
}

/// Builds the full FunctionFS descriptor blob: v2 header, fs/hs descriptor
/// counts, then the full-speed and high-speed descriptor triples
/// (spec.md §6).
pub fn descriptor_blob() -> Vec<u8> {
    let fs = speed_triple();
    let hs = speed_triple();

    let fs_count: u32 = 3;
    let hs_count: u32 = 3;
    let header_len = 12 + 4 + 4;
    let total_len = (header_len + fs.len() + hs.len()) as u32;

    let header = DescsHeaderV2 {
        magic: FUNCTIONFS_DESCRIPTORS_MAGIC_V2,
        length: total_len,
        flags: FUNCTIONFS_HAS_FS_DESC | FUNCTIONFS_HAS_HS_DESC,
    };

    let mut blob = Vec::with_capacity(total_len as usize);
    blob.extend_from_slice(&header.pack().unwrap());
    blob.extend_from_slice(&fs_count.to_le_bytes());
    blob.extend_from_slice(&hs_count.to_le_bytes());
    blob.extend_from_slice(&fs);
    blob.extend_from_slice(&hs);
    blob
}

/// Builds the FunctionFS strings blob: magic, length, language count,
/// langid, then each NUL-terminated string in declaration order
/// (spec.md §6).
pub fn strings_blob() -> Vec<u8> {
    let strings = [
        ds3::INTERFACE,
        ds3::PRODUCT,
        ds3::MANUFACTURER,
        ds3::SERIAL,
        ds3::CONFIGURATION,
    ];

    let mut body = Vec::new();
    body.extend_from_slice(&ds3::LANGID_EN_US.to_le_bytes());
    for s in strings {
        body.extend_from_slice(s.as_bytes());
        body.push(0);
    }

    let header_len = 4 + 4 + 4;
    let total_len = (header_len + body.len()) as u32;

    let mut blob = Vec::with_capacity(total_len as usize);
    blob.extend_from_slice(&FUNCTIONFS_STRINGS_MAGIC.to_le_bytes());
    blob.extend_from_slice(&total_len.to_le_bytes());
    blob.extend_from_slice(&1u32.to_le_bytes()); // one language
    blob.extend_from_slice(&body);
    blob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_blob_starts_with_v2_magic() {
        let blob = descriptor_blob();
        let magic = u32::from_le_bytes(blob[0..4].try_into().unwrap());
        assert_eq!(magic, FUNCTIONFS_DESCRIPTORS_MAGIC_V2);
    }

    #[test]
    fn descriptor_blob_length_field_matches_actual_length() {
        let blob = descriptor_blob();
        let length = u32::from_le_bytes(blob[4..8].try_into().unwrap());
        assert_eq!(length as usize, blob.len());
    }

    #[test]
    fn descriptor_blob_carries_both_fs_and_hs_flags() {
        let blob = descriptor_blob();
        let flags = u32::from_le_bytes(blob[8..12].try_into().unwrap());
        assert_eq!(flags, FUNCTIONFS_HAS_FS_DESC | FUNCTIONFS_HAS_HS_DESC);
    }

    #[test]
    fn strings_blob_contains_the_interface_string() {
        let blob = strings_blob();
        let text = String::from_utf8_lossy(&blob);
        assert!(text.contains(ds3::INTERFACE));
        assert!(text.contains(ds3::PRODUCT));
    }
}
