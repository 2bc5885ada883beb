//! Minimal ISO 9660 image builder used by tests
//!
//! Lays out a descriptor set, one sector per directory and contiguous file
//! extents. Optional Rock Ridge `SP`/`NM` entries and a Joliet tree.

use super::reader::SECTOR_SIZE;

const SECTOR: usize = SECTOR_SIZE as usize;

/// Fixed record date: 2024-05-06 12:30:00 UTC
const RECORD_DATE: [u8; 7] = [124, 5, 6, 12, 30, 0, 0];

pub(crate) enum TestNode {
    Dir(&'static str, Vec<TestNode>),
    File(&'static str, Vec<u8>),
    HiddenFile(&'static str, Vec<u8>),
}

pub(crate) struct TestImageOptions {
    pub volume_id: &'static str,
    pub system_id: &'static str,
    pub rock_ridge: bool,
    pub joliet: bool,
}

impl Default for TestImageOptions {
    fn default() -> Self {
        Self {
            volume_id: "TEST_VOLUME",
            system_id: "LINUX",
            rock_ridge: false,
            joliet: false,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum NameStyle {
    Primary,
    Joliet,
}

#[derive(Clone)]
struct Placed {
    name: &'static str,
    lba: u32,
    data: Vec<u8>,
    hidden: bool,
    children: Option<Vec<Placed>>,
}

/// Build a complete image in memory
pub(crate) fn build_image(root: &[TestNode], options: &TestImageOptions) -> Vec<u8> {
    let mut next = 20u32;
    let root_lba = next;
    next += 1;
    let primary = place(root, &mut next);

    let joliet = if options.joliet {
        let lba = next;
        next += 1;
        Some((lba, relocate_dirs(&primary, &mut next)))
    } else {
        None
    };

    let mut image = vec![0u8; next as usize * SECTOR];
    write_files(&mut image, &primary);
    write_dir(&mut image, root_lba, root_lba, &primary, options.rock_ridge, NameStyle::Primary, true);

    let mut descriptor_lba = 16;
    write_sector(&mut image, descriptor_lba, &descriptor(1, options, root_lba, next));
    descriptor_lba += 1;

    if let Some((joliet_root, tree)) = &joliet {
        write_dir(&mut image, *joliet_root, *joliet_root, tree, false, NameStyle::Joliet, true);
        write_sector(&mut image, descriptor_lba, &descriptor(2, options, *joliet_root, next));
        descriptor_lba += 1;
    }

    let mut terminator = vec![0u8; SECTOR];
    terminator[0] = 255;
    terminator[1..6].copy_from_slice(b"CD001");
    terminator[6] = 1;
    write_sector(&mut image, descriptor_lba, &terminator);

    image
}

fn place(nodes: &[TestNode], next: &mut u32) -> Vec<Placed> {
    let mut placed = Vec::new();
    for node in nodes {
        match node {
            TestNode::Dir(name, children) => {
                let lba = *next;
                *next += 1;
                placed.push(Placed {
                    name: *name,
                    lba,
                    data: Vec::new(),
                    hidden: false,
                    children: Some(place(children, next)),
                });
            }
            TestNode::File(name, data) | TestNode::HiddenFile(name, data) => {
                let lba = *next;
                *next += data.len().div_ceil(SECTOR) as u32;
                placed.push(Placed {
                    name: *name,
                    lba,
                    data: data.clone(),
                    hidden: matches!(node, TestNode::HiddenFile(..)),
                    children: None,
                });
            }
        }
    }
    placed
}

fn relocate_dirs(nodes: &[Placed], next: &mut u32) -> Vec<Placed> {
    nodes
        .iter()
        .map(|node| match &node.children {
            Some(children) => {
                let lba = *next;
                *next += 1;
                Placed {
                    lba,
                    children: Some(relocate_dirs(children, next)),
                    ..node.clone()
                }
            }
            None => node.clone(),
        })
        .collect()
}

fn write_files(image: &mut [u8], nodes: &[Placed]) {
    for node in nodes {
        match &node.children {
            Some(children) => write_files(image, children),
            None => {
                let start = node.lba as usize * SECTOR;
                image[start..start + node.data.len()].copy_from_slice(&node.data);
            }
        }
    }
}

fn write_dir(
    image: &mut [u8],
    lba: u32,
    parent_lba: u32,
    children: &[Placed],
    rock_ridge: bool,
    style: NameStyle,
    is_root: bool,
) {
    let mut data = Vec::new();
    let self_use: &[u8] = if rock_ridge && is_root {
        &[b'S', b'P', 7, 1, 0xBE, 0xEF, 0]
    } else {
        &[]
    };
    data.extend(record(&[0], lba, SECTOR as u32, 0x02, self_use));
    data.extend(record(&[1], parent_lba, SECTOR as u32, 0x02, &[]));

    for child in children {
        let is_dir = child.children.is_some();
        let identifier = identifier(child.name, is_dir, style);
        let system_use = if rock_ridge { nm_entry(child.name) } else { Vec::new() };
        let (length, mut flags) = if is_dir {
            (SECTOR as u32, 0x02)
        } else {
            (child.data.len() as u32, 0x00)
        };
        if child.hidden {
            flags |= 0x01;
        }
        data.extend(record(&identifier, child.lba, length, flags, &system_use));
    }

    assert!(data.len() <= SECTOR, "test directory does not fit one sector");
    write_sector(image, lba, &data);

    for child in children {
        if let Some(grandchildren) = &child.children {
            write_dir(image, child.lba, lba, grandchildren, rock_ridge, style, false);
        }
    }
}

fn identifier(name: &str, is_dir: bool, style: NameStyle) -> Vec<u8> {
    let text = match (style, is_dir) {
        (NameStyle::Primary, true) => name.to_uppercase(),
        (NameStyle::Primary, false) => format!("{};1", name.to_uppercase()),
        (NameStyle::Joliet, true) => name.to_string(),
        (NameStyle::Joliet, false) => format!("{};1", name),
    };

    match style {
        NameStyle::Primary => text.into_bytes(),
        NameStyle::Joliet => ucs2(&text),
    }
}

fn nm_entry(name: &str) -> Vec<u8> {
    let mut entry = vec![b'N', b'M', (5 + name.len()) as u8, 1, 0];
    entry.extend_from_slice(name.as_bytes());
    entry
}

fn record(identifier: &[u8], lba: u32, length: u32, flags: u8, system_use: &[u8]) -> Vec<u8> {
    let mut r = vec![0u8; 33];
    r.extend_from_slice(identifier);
    if identifier.len() % 2 == 0 {
        r.push(0);
    }
    r.extend_from_slice(system_use);
    if r.len() % 2 == 1 {
        r.push(0);
    }

    r[0] = r.len() as u8;
    r[2..6].copy_from_slice(&lba.to_le_bytes());
    r[6..10].copy_from_slice(&lba.to_be_bytes());
    r[10..14].copy_from_slice(&length.to_le_bytes());
    r[14..18].copy_from_slice(&length.to_be_bytes());
    r[18..25].copy_from_slice(&RECORD_DATE);
    r[25] = flags;
    r[28] = 1;
    r[31] = 1;
    r[32] = identifier.len() as u8;
    r
}

fn descriptor(kind: u8, options: &TestImageOptions, root_lba: u32, blocks: u32) -> Vec<u8> {
    let mut s = vec![0u8; SECTOR];
    s[0] = kind;
    s[1..6].copy_from_slice(b"CD001");
    s[6] = 1;

    let (system_id, volume_id) = if kind == 2 {
        (padded_ucs2(options.system_id), padded_ucs2(options.volume_id))
    } else {
        (padded_ascii(options.system_id), padded_ascii(options.volume_id))
    };
    s[8..40].copy_from_slice(&system_id);
    s[40..72].copy_from_slice(&volume_id);

    s[80..84].copy_from_slice(&blocks.to_le_bytes());
    s[84..88].copy_from_slice(&blocks.to_be_bytes());
    if kind == 2 {
        s[88..91].copy_from_slice(b"%/E");
    }
    s[128..130].copy_from_slice(&(SECTOR as u16).to_le_bytes());
    s[130..132].copy_from_slice(&(SECTOR as u16).to_be_bytes());

    let root = record(&[0], root_lba, SECTOR as u32, 0x02, &[]);
    s[156..156 + root.len()].copy_from_slice(&root);
    s
}

fn write_sector(image: &mut [u8], lba: u32, data: &[u8]) {
    let start = lba as usize * SECTOR;
    image[start..start + data.len()].copy_from_slice(data);
}

fn ucs2(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

fn padded_ascii(text: &str) -> [u8; 32] {
    let mut field = [b' '; 32];
    field[..text.len()].copy_from_slice(text.as_bytes());
    field
}

fn padded_ucs2(text: &str) -> [u8; 32] {
    let mut field = [0u8; 32];
    for pair in field.chunks_exact_mut(2) {
        pair.copy_from_slice(&[0x00, 0x20]);
    }
    let encoded = ucs2(text);
    field[..encoded.len()].copy_from_slice(&encoded);
    field
}
