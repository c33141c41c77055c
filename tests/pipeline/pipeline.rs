mod common;

use common::{
    bitcode_dump,
    CannedBitcode,
    CannedSections,
};
use strata::{
    testing::{
        build_archive,
        build_elf,
        build_object,
        TempFile,
    },
    codec::{
        decode_positions,
        encode_literals,
    },
    create_merge_string_replacements,
    resolve_string_pieces,
    Config,
    LiteralExtractor,
    Logger,
    MergeStats,
    StrataError,
    StringLiteral,
    StringLiteralAnalyzer,
    Target,
};

const BITCODE: &[u8] = b"BC\xc0\xde\x35\x14\x00\x00";
const SHT_PROGBITS: u32 = 1;

#[test]
fn test_batch_roundtrip() {
    let a = TempFile::new("a.o", BITCODE);
    let b = TempFile::new("b.o", BITCODE);
    let a_path = a.0.display().to_string();
    let b_path = b.0.display().to_string();

    let dumper = CannedBitcode(vec![("a.o", bitcode_dump(&["hello", "shared"])), ("b.o", bitcode_dump(&["shared", "lo"]))]);
    let extractor = LiteralExtractor::new(CannedSections(String::new()), dumper, 2);
    let targets = Target::group_paths(&[&a_path, &b_path]);
    let literals = extractor.extract(&targets, &mut Logger::hidden()).unwrap();
    assert_eq!(literals[&a_path], vec![b"hello\0".to_vec(), b"shared\0".to_vec()]);

    /* Goes through the same encoding as the batch executor */
    let haystacks = [b"hello\0shared\0".to_vec()];
    let encoded = resolve_string_pieces(&encode_literals(&literals).unwrap(), &haystacks).unwrap();
    let positions = encoded.iter().map(|x| decode_positions(x).unwrap()).collect::<Vec<_>>();

    let (replacements, stats) = create_merge_string_replacements(&[0x2000], &positions).unwrap();
    assert_eq!(stats, MergeStats {
        removed: 1,
        removed_bytes: 3,
        aliases: 1,
    });

    let aliases = vec![a_path.clone(), b_path.clone()];
    assert_eq!(replacements, vec![vec![
        StringLiteral {
            address: 0x2000,
            size: 6,
            object_path: a_path.clone(),
            aliases: Vec::new(),
        },
        StringLiteral {
            address: 0x2006,
            size: 7,
            object_path: a_path,
            aliases: aliases.clone(),
        },
        StringLiteral {
            address: 0x2006,
            size: 7,
            object_path: b_path,
            aliases,
        },
    ]]);
}

#[test]
fn test_analyze_mixed_objects() {
    let native = TempFile::new("native.o", &build_object(&[(".rodata.str1.1", 1, b"native\0\0wide\0")]));
    let lto = TempFile::new("lto.o", BITCODE);
    let linked = TempFile::new("linked", &build_elf(&[(".text", SHT_PROGBITS, 0x1000, b"\xc3"), (".rodata", SHT_PROGBITS, 0x4000, b"wide\0lto only\0native\0"), (".data", SHT_PROGBITS, 0x5000, b"native\0")]));

    let listing = "Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0
  [ 1] .rodata.str1.1    PROGBITS        0000000000000000 000040 00000d 01 AMS  0   0  1
";
    let extractor = LiteralExtractor::new(CannedSections(listing.to_string()), CannedBitcode(vec![("lto.o", bitcode_dump(&["lto only", "optimized away"]))]), 2);
    let analysis = StringLiteralAnalyzer::new(extractor).analyze(&linked.0, &[Target::Object(native.0.clone()), Target::Object(lto.0.clone())], &mut Logger::hidden()).unwrap();

    assert_eq!(analysis.sections.len(), 1);
    assert_eq!(analysis.sections[0].address, 0x4000);

    let found = analysis.literals[0].iter().map(|x| (x.address, x.size, x.object_path.clone())).collect::<Vec<_>>();
    assert_eq!(found, vec![
        (0x4000, 5, native.0.display().to_string()),
        (0x4005, 9, lto.0.display().to_string()),
        (0x400e, 7, native.0.display().to_string()),
    ]);
    assert_eq!(analysis.attributed_bytes(), 21);
}

#[test]
fn test_analyze_mixed_archive() {
    let native = build_object(&[(".rodata.str1.1", 1, b"from native\0")]);
    let archive = TempFile::new("libmixed.a", &build_archive(&[("native.o", &native), ("lto.o", BITCODE)]));
    let linked = TempFile::new("linked-mixed", &build_elf(&[(".rodata", SHT_PROGBITS, 0x8000, b"from lto\0from native\0")]));

    /* Archives never go through the section dumper */
    let extractor = LiteralExtractor::new(CannedSections("garbage".to_string()), CannedBitcode(vec![("", bitcode_dump(&["from lto"]))]), 2);
    let targets = Target::group_paths(&[Target::member_path(&archive.0, "native.o"), Target::member_path(&archive.0, "lto.o")]);
    let analysis = StringLiteralAnalyzer::new(extractor).analyze(&linked.0, &targets, &mut Logger::hidden()).unwrap();

    let found = analysis.literals[0].iter().map(|x| (x.address, x.size, x.object_path.clone())).collect::<Vec<_>>();
    assert_eq!(found, vec![(0x8000, 9, Target::member_path(&archive.0, "lto.o")), (0x8009, 12, Target::member_path(&archive.0, "native.o"))]);
}

#[test]
fn test_rejects_wide_limit() {
    let err = Config::builder().char_width_limit(5).build().unwrap_err();
    assert!(matches!(err, StrataError::InvalidConfig(_)));
}

#[test]
#[ignore]
fn test_real_binary() {
    let config = Config::from_env().unwrap();
    let analysis = StringLiteralAnalyzer::from_config(&config).analyze("/bin/ls", &[], &mut Logger::spinner()).unwrap();
    assert!(!analysis.sections.is_empty());
    assert_eq!(analysis.num_literals(), 0);
}
