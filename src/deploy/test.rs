use super::*;
use crate::device::{DEPLOY_FILE, INFO_FILE};
use crate::uf2::{encode_block, FLAG_NO_FLASH};

fn mount(base: &Path, name: &str, board: &str) -> PathBuf
{
	let root = base.join(name);
	fs::create_dir(&root).unwrap();
	fs::write(root.join(INFO_FILE), format!("UF2 Bootloader\nBoard-ID: {board}\n")).unwrap();
	root
}

fn pattern(len: usize) -> Vec<u8>
{
	(0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn detect_container()
{
	let container = raw_to_container(&pattern(10), 0x2000, None).unwrap();
	assert!(is_container(container.as_bytes()));
	assert!(!is_container(&pattern(1024)));
	assert!(!is_container(&container.as_bytes()[..BLOCK_LEN - 1]));
}

#[test]
fn convert_both_ways()
{
	let config = Config::default().with_board_tag(Some(0x1234));
	let to_uf2 = convert(&pattern(300), &config).unwrap();
	assert_eq!(to_uf2.kind(), ImageKind::Container);
	assert_eq!(to_uf2.addr(), 0x2000);
	assert_eq!(to_uf2.bytes().len(), 2 * BLOCK_LEN);
	
	let to_bin = convert(to_uf2.bytes(), &Config::new(0x9999)).unwrap();
	assert_eq!(to_bin.kind(), ImageKind::Raw);
	assert_eq!(to_bin, Conversion::ToRaw{raw: RawImage::new(0x2000, pattern(300)), board_tag: Some(0x1234)});
}

#[test]
fn convert_bad_container()
{
	let mut src = raw_to_container(&pattern(600), 0x2000, None).unwrap().into_bytes();
	src[2 * BLOCK_LEN + 0x1FC] = 0;
	match convert(&src, &Config::default())
	{
		Err(err @ FormatError::BadMagic{..}) => assert_eq!(err.block(), Some(2)),
		r => panic!("unexpected result {r:?}"),
	}
}

#[test]
fn default_output()
{
	assert_eq!(ImageKind::Raw.default_output(), PathBuf::from("flash.bin"));
	assert_eq!(ImageKind::Container.default_output(), PathBuf::from("flash.uf2"));
}

#[test]
fn explicit_output()
{
	let dir = tempfile::tempdir().unwrap();
	let drives = tempfile::tempdir().unwrap();
	let drive = mount(drives.path(), "DRIVE", "ABC123");
	let out = dir.path().join("out.uf2");
	let request = Request{output: Some(out.clone()), ..Request::default()};
	match convert_or_flash(&pattern(300), &Config::default(), &request, &Locator::scan(vec![drives.path().to_path_buf()])).unwrap()
	{
		Outcome::Converted{kind, path, len} =>
		{
			assert_eq!((kind, path, len), (ImageKind::Container, out.clone(), 2 * BLOCK_LEN));
		},
		r => panic!("unexpected outcome {r:?}"),
	}
	let written = fs::read(&out).unwrap();
	assert_eq!(written, raw_to_container(&pattern(300), 0x2000, None).unwrap().into_bytes());
	// an explicit output never touches the drives
	assert!(!drive.join(DEPLOY_FILE).exists());
}

#[test]
fn container_to_bin_file()
{
	let dir = tempfile::tempdir().unwrap();
	let src = raw_to_container(&pattern(1000), 0x8000, None).unwrap().into_bytes();
	let out = dir.path().join("out.bin");
	let request = Request{output: Some(out.clone()), convert_only: true, ..Request::default()};
	let outcome = convert_or_flash(&src, &Config::default(), &request, &Locator::scan(Vec::new())).unwrap();
	assert!(matches!(outcome, Outcome::Converted{kind: ImageKind::Raw, len: 1000, ..}));
	assert_eq!(fs::read(&out).unwrap(), pattern(1000));
}

#[test]
fn no_target()
{
	let drives = tempfile::tempdir().unwrap();
	fs::create_dir(drives.path().join("EMPTY")).unwrap();
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	let result = convert_or_flash(&pattern(10), &Config::default(), &Request::default(), &locator);
	assert!(matches!(result, Err(Error::NoTarget)));
}

#[test]
fn not_a_target()
{
	let drives = tempfile::tempdir().unwrap();
	let request = Request{target: Some(drives.path().to_path_buf()), ..Request::default()};
	let result = convert_or_flash(&pattern(10), &Config::default(), &request, &Locator::scan(Vec::new()));
	assert!(matches!(result, Err(Error::NotATarget(p)) if p == drives.path()));
}

#[test]
fn deploy_one()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "MICROBIT", "9904");
	let target = FlashTarget::probe(&root).unwrap();
	let image = raw_to_container(&pattern(700), 0x2000, None).unwrap();
	let path = deploy(&image, &target).unwrap();
	assert_eq!(path, root.join(DEPLOY_FILE));
	assert_eq!(fs::read(&path).unwrap(), image.as_bytes());
}

#[test]
fn deploy_sequence_order()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "DRIVE", "X");
	let a = encode_block(0x2000, &[1; 256], 0, 2, None).unwrap();
	let b = encode_block(0x2100, &[2; 256], 1, 2, None).unwrap();
	let image = ContainerImage::from_bytes([b, a].concat()).unwrap();
	deploy(&image, &FlashTarget::probe(&root).unwrap()).unwrap();
	assert_eq!(fs::read(root.join(DEPLOY_FILE)).unwrap(), [a, b].concat());
}

#[test]
fn deploy_write_failed()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "BROKEN", "X");
	// a directory in the way makes creating the file fail
	fs::create_dir(root.join(DEPLOY_FILE)).unwrap();
	let target = FlashTarget::probe(&root).unwrap();
	let image = raw_to_container(&pattern(10), 0x2000, None).unwrap();
	match deploy(&image, &target)
	{
		Err(IoError::WriteFailed{path, ..}) => assert_eq!(path, root.join(DEPLOY_FILE)),
		r => panic!("unexpected result {r:?}"),
	}
}

#[test]
fn flash_all_targets()
{
	let drives = tempfile::tempdir().unwrap();
	let a = mount(drives.path(), "A", "first");
	let b = mount(drives.path(), "B", "second");
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	let outcome = convert_or_flash(&pattern(300), &Config::default(), &Request::default(), &locator).unwrap();
	match outcome
	{
		Outcome::Deployed(report) =>
		{
			assert!(report.is_success());
			let ids: Vec<&str> = report.flashed.iter().map(|t| t.board_id()).collect();
			assert_eq!(ids, ["first", "second"]);
		},
		r => panic!("unexpected outcome {r:?}"),
	}
	let expect = raw_to_container(&pattern(300), 0x2000, None).unwrap().into_bytes();
	assert_eq!(fs::read(a.join(DEPLOY_FILE)).unwrap(), expect);
	assert_eq!(fs::read(b.join(DEPLOY_FILE)).unwrap(), expect);
}

#[test]
fn flash_continues_past_failure()
{
	let drives = tempfile::tempdir().unwrap();
	let a = mount(drives.path(), "A", "broken");
	fs::create_dir(a.join(DEPLOY_FILE)).unwrap();
	let b = mount(drives.path(), "B", "fine");
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	match convert_or_flash(&pattern(300), &Config::default(), &Request::default(), &locator)
	{
		Err(Error::Deploy(report)) =>
		{
			assert_eq!(report.attempted(), 2);
			assert_eq!(report.flashed.len(), 1);
			assert_eq!(report.flashed[0].board_id(), "fine");
			assert_eq!(report.failed.len(), 1);
			assert_eq!(report.failed[0].0.board_id(), "broken");
			assert!(report.to_string().contains("1 of 2"));
		},
		r => panic!("unexpected result {r:?}"),
	}
	assert!(b.join(DEPLOY_FILE).is_file());
}

#[test]
fn flash_explicit_target()
{
	let drives = tempfile::tempdir().unwrap();
	let a = mount(drives.path(), "A", "listed");
	let other = tempfile::tempdir().unwrap();
	let b = mount(other.path(), "B", "chosen");
	let request = Request{target: Some(b.clone()), ..Request::default()};
	let outcome = convert_or_flash(&pattern(10), &Config::default(), &request, &Locator::scan(vec![drives.path().to_path_buf()])).unwrap();
	assert!(matches!(outcome, Outcome::Deployed(ref r) if r.flashed.len() == 1 && r.flashed[0].board_id() == "chosen"));
	assert!(b.join(DEPLOY_FILE).is_file());
	assert!(!a.join(DEPLOY_FILE).exists());
}

#[test]
fn flash_container_input()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "DRIVE", "X");
	let data = encode_block(0x4000, &[0x11; 256], 0, 2, Some(7)).unwrap();
	let mut meta = encode_block(0, &[0xEE; 32], 1, 2, Some(7)).unwrap();
	meta[0x008] |= FLAG_NO_FLASH as u8;
	let src = [meta, data].concat();
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	convert_or_flash(&src, &Config::default(), &Request::default(), &locator).unwrap();
	// the drive gets the input blocks untouched, in sequence order
	assert_eq!(fs::read(root.join(DEPLOY_FILE)).unwrap(), [data, meta].concat());
}

#[test]
fn flash_sparse_container()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "DRIVE", "X");
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	let app = encode_block(0x2000, &[0xAA; 256], 0, 2, None).unwrap();
	let cfg = encode_block(0x8000, &[0xCC; 256], 1, 2, None).unwrap();
	let src = [app, cfg].concat();
	convert_or_flash(&src, &Config::default(), &Request::default(), &locator).unwrap();
	let written = ContainerImage::from_bytes(fs::read(root.join(DEPLOY_FILE)).unwrap()).unwrap();
	assert_eq!(written.len(), 2);
	assert_eq!(written.as_bytes(), src.as_slice());
	
	// regions further apart than the padding limit still flash
	let far = encode_block(0x1000_1000, &[0xCC; 256], 1, 2, None).unwrap();
	let src = [encode_block(0, &[0xAA; 256], 0, 2, None).unwrap(), far].concat();
	convert_or_flash(&src, &Config::default(), &Request::default(), &locator).unwrap();
	assert_eq!(fs::read(root.join(DEPLOY_FILE)).unwrap(), src);
	// but converting the same image to a file is refused
	let out = drives.path().join("far.bin");
	let request = Request{output: Some(out.clone()), ..Request::default()};
	let result = convert_or_flash(&src, &Config::default(), &request, &locator);
	assert!(matches!(result, Err(Error::Format(FormatError::ExcessivePadding{block: 1, ..}))));
	assert!(!out.exists());
}

#[test]
fn flash_bad_container()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "DRIVE", "X");
	let mut src = raw_to_container(&pattern(600), 0x2000, None).unwrap().into_bytes();
	src[BLOCK_LEN + 0x1FC] = 0;
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	match convert_or_flash(&src, &Config::default(), &Request::default(), &locator)
	{
		Err(Error::Format(err @ FormatError::BadMagic{..})) => assert_eq!(err.block(), Some(1)),
		r => panic!("unexpected result {r:?}"),
	}
	assert!(!root.join(DEPLOY_FILE).exists());
}

#[test]
fn flash_empty_image()
{
	let drives = tempfile::tempdir().unwrap();
	let root = mount(drives.path(), "DRIVE", "X");
	let locator = Locator::scan(vec![drives.path().to_path_buf()]);
	let result = convert_or_flash(&[], &Config::default(), &Request::default(), &locator);
	assert!(matches!(result, Err(Error::EmptyImage)));
	
	let mut meta = encode_block(0, &[0xEE; 32], 0, 1, None).unwrap();
	meta[0x008] |= FLAG_NO_FLASH as u8;
	let result = convert_or_flash(&meta, &Config::default(), &Request::default(), &locator);
	assert!(matches!(result, Err(Error::EmptyImage)));
	assert!(!root.join(DEPLOY_FILE).exists());
	
	// converting an empty input to a file still works
	let out = drives.path().join("empty.uf2");
	let request = Request{output: Some(out.clone()), ..Request::default()};
	let outcome = convert_or_flash(&[], &Config::default(), &request, &locator).unwrap();
	assert!(matches!(outcome, Outcome::Converted{len: 0, ..}));
	assert_eq!(fs::read(&out).unwrap(), b"");
}

#[test]
fn read_failed()
{
	let dir = tempfile::tempdir().unwrap();
	let missing = dir.path().join("missing.bin");
	match read_input(&missing)
	{
		Err(IoError::ReadFailed{path, ..}) => assert_eq!(path, missing),
		r => panic!("unexpected result {r:?}"),
	}
	fs::write(&missing, b"now here").unwrap();
	assert_eq!(read_input(&missing).unwrap(), b"now here");
}
