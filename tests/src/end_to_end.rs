use binstr_core::fixtures::{ElfBuilder, Image, PeBuilder};
use binstr_core::scanner::ScanOutcome;
use binstr_core::word::{Endianness, FormatAttributes, WordWidth};
use binstr_core::{run, ExecutableFormat, PatchConfig, RunOutput};
use binstr_utils::errors::{LocateError, PatchError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const RODATA: &[u8] = b"usage: %s [options]\0\0\0\0version 1.0.2\0\0\0Copyright ACME\0\0\0\0\0";

fn layouts() -> Vec<(&'static str, Image, ExecutableFormat, &'static str)> {
    let mut images = Vec::new();
    for (label, width, order) in [
        ("elf32-le", WordWidth::Narrow, Endianness::Little),
        ("elf32-be", WordWidth::Narrow, Endianness::Big),
        ("elf64-le", WordWidth::Wide, Endianness::Little),
        ("elf64-be", WordWidth::Wide, Endianness::Big),
    ] {
        let image = ElfBuilder::new(width, order)
            .section(".text", &[0x90; 64])
            .section(".rodata", RODATA)
            .section(".comment", b"GCC: (GNU) 13.2.0\0")
            .trailer(b"\x01\x02\x03 trailing bytes")
            .build();
        images.push((label, image, ExecutableFormat::Elf, ".rodata"));
    }
    let pe = PeBuilder::new()
        .section(b".text", &[0xcc; 64])
        .section(b".rdata", RODATA)
        .section(b".data", b"\x01\x00\x00\x00")
        .trailer(b"overlay")
        .build();
    images.push(("pe32", pe, ExecutableFormat::Pe, ".rdata"));
    images
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn output_mode_touches_only_the_section() {
    crate::init_tracing();
    let dir = TempDir::new().unwrap();

    for (label, image, format, section) in layouts() {
        let input = write(&dir, label, &image.bytes);
        let output = dir.path().join(format!("{label}.patched"));
        let config = PatchConfig::replacing(&input, "1.0.2", "2.0").with_output(&output);

        let RunOutput::Replaced(report) = run(&config).unwrap() else {
            panic!("{label}: expected a replace report");
        };
        assert_eq!(report.format, format, "{label}");
        assert_eq!(report.section, section, "{label}");
        assert_eq!(report.outcome, ScanOutcome::Replaced, "{label}");

        let loc = image.location(section);
        assert_eq!(report.location, loc, "{label}");
        let (start, end) = (loc.offset as usize, loc.end() as usize);
        let patched = fs::read(&output).unwrap();
        assert_eq!(patched.len(), image.bytes.len(), "{label}");
        assert_eq!(patched[..start], image.bytes[..start], "{label}");
        assert_eq!(patched[end..], image.bytes[end..], "{label}");
        assert_eq!(
            &patched[start..end],
            &b"usage: %s [options]\0\0\0\0version 2.0\0\0\0\0\0Copyright ACME\0\0\0\0\0"[..],
            "{label}"
        );
        assert_eq!(fs::read(&input).unwrap(), image.bytes, "{label}: input modified");
    }
}

#[test]
fn in_place_and_output_modes_agree() {
    crate::init_tracing();
    let dir = TempDir::new().unwrap();

    for (label, image, _, _) in layouts() {
        let copy_src = write(&dir, &format!("{label}.src"), &image.bytes);
        let copy_dst = dir.path().join(format!("{label}.dst"));
        let in_place = write(&dir, &format!("{label}.inplace"), &image.bytes);

        run(&PatchConfig::replacing(&copy_src, "ACME", "Acme").with_output(&copy_dst)).unwrap();
        run(&PatchConfig::replacing(&in_place, "ACME", "Acme")).unwrap();

        assert_eq!(
            fs::read(&copy_dst).unwrap(),
            fs::read(&in_place).unwrap(),
            "{label}"
        );
    }
}

#[test]
fn listing_reports_absolute_offsets() {
    let dir = TempDir::new().unwrap();

    for (label, image, _, section) in layouts() {
        let input = write(&dir, label, &image.bytes);
        let RunOutput::List(listing) = run(&PatchConfig::listing(&input)).unwrap() else {
            panic!("{label}: expected a listing");
        };
        let base = image.location(section).offset;
        let found: Vec<_> = listing.entries().map(|e| (e.offset - base, e.text())).collect();
        assert_eq!(
            found,
            vec![
                (0, "usage: %s [options]".into()),
                (23, "version 1.0.2".into()),
                (39, "Copyright ACME".into()),
            ],
            "{label}"
        );
    }
}

#[test]
fn named_sections_and_header_attributes() {
    let dir = TempDir::new().unwrap();
    let image = ElfBuilder::new(WordWidth::Narrow, Endianness::Big)
        .section(".rodata", RODATA)
        .section(".comment", b"GCC: (GNU) 13.2.0\0")
        .build();
    let input = write(&dir, "be32", &image.bytes);

    let config = PatchConfig::replacing(&input, "GNU", "gnu").with_section(".comment");
    let RunOutput::Replaced(report) = run(&config).unwrap() else {
        panic!("expected a replace report");
    };
    assert_eq!(
        report.attributes,
        FormatAttributes {
            word_width: WordWidth::Narrow,
            endianness: Endianness::Big,
        }
    );
    let loc = image.location(".comment");
    let bytes = fs::read(&input).unwrap();
    assert_eq!(
        &bytes[loc.offset as usize..loc.end() as usize],
        b"GCC: (gnu) 13.2.0\0"
    );
    // .rodata is untouched.
    let rodata = image.location(".rodata");
    assert_eq!(
        &bytes[rodata.offset as usize..rodata.end() as usize],
        RODATA
    );
}

#[test]
fn pe_with_bad_signature() {
    let dir = TempDir::new().unwrap();
    let image = PeBuilder::new()
        .signature(*b"NE\0\0")
        .section(b".rdata", RODATA)
        .build();
    let input = write(&dir, "bad.exe", &image.bytes);

    let err = run(&PatchConfig::listing(&input)).unwrap_err();
    assert!(matches!(err, PatchError::Locate(LocateError::BadSignature(sig)) if &sig == b"NE\0\0"));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn report_serializes_for_tooling() {
    let dir = TempDir::new().unwrap();
    let (_, image, _, _) = layouts().remove(2);
    let input = write(&dir, "elf64", &image.bytes);

    let RunOutput::Replaced(report) =
        run(&PatchConfig::replacing(&input, "options", "opts")).unwrap()
    else {
        panic!("expected a replace report");
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["format"], "Elf");
    assert_eq!(json["section"], ".rodata");
    assert_eq!(json["outcome"], "replaced");
    assert_eq!(json["replaced"], 1);
    assert_eq!(json["attributes"]["word_width"], "Wide");
}
