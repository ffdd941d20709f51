use std::fs;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::vec::IntoIter as VecIntoIter;

use log::debug;

pub mod host;

pub use host::{host_roots, DriveLetters, MountRoots, ScanDirs};


pub const INFO_FILE: &str = "INFO_UF2.TXT";
pub const DEPLOY_FILE: &str = "NEW.UF2";
const BOARD_ID_KEY: &str = "Board-ID:";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlashTarget
{
	root: PathBuf,
	board_id: String,
}

impl FlashTarget
{
	pub fn probe(root: &Path) -> Option<Self>
	{
		let marker = root.join(INFO_FILE);
		let bytes = match fs::read(&marker)
		{
			Ok(bytes) => bytes,
			Err(e) =>
			{
				debug!("{} has no usable marker: {e}", root.display());
				return None;
			},
		};
		let text = String::from_utf8_lossy(&bytes);
		match parse_board_id(&text)
		{
			Some(id) => Some(Self{root: root.to_path_buf(), board_id: id.to_owned()}),
			None =>
			{
				debug!("{} has no Board-ID line", marker.display());
				None
			},
		}
	}
	
	pub fn root(&self) -> &Path
	{
		&self.root
	}
	
	pub fn board_id(&self) -> &str
	{
		&self.board_id
	}
	
	pub fn deploy_path(&self) -> PathBuf
	{
		self.root.join(DEPLOY_FILE)
	}
}

pub fn parse_board_id(text: &str) -> Option<&str>
{
	text.lines().find_map(|line|
	{
		let pos = line.find(BOARD_ID_KEY)?;
		let id = line[pos + BOARD_ID_KEY.len()..].trim();
		if id.is_empty() {None} else {Some(id)}
	})
}

pub struct Locator
{
	roots: Box<dyn MountRoots>,
}

impl Locator
{
	pub fn new(roots: Box<dyn MountRoots>) -> Self
	{
		Self{roots}
	}
	
	pub fn host() -> Self
	{
		Self::new(host_roots())
	}
	
	pub fn scan(dirs: Vec<PathBuf>) -> Self
	{
		Self::new(Box::new(ScanDirs::new(dirs)))
	}
	
	pub fn list_targets(&self) -> Targets
	{
		let mut candidates = self.roots.candidates();
		candidates.sort();
		candidates.dedup();
		debug!("{} candidate mount roots from {}", candidates.len(), self.roots.name());
		Targets{candidates: candidates.into_iter()}
	}
}

#[derive(Clone, Debug)]
pub struct Targets
{
	candidates: VecIntoIter<PathBuf>,
}

impl Iterator for Targets
{
	type Item = FlashTarget;
	
	fn next(&mut self) -> Option<Self::Item>
	{
		self.candidates.by_ref().find_map(|root| FlashTarget::probe(&root))
	}
	
	fn size_hint(&self) -> (usize, Option<usize>)
	{
		(0, self.candidates.size_hint().1)
	}
}

impl FusedIterator for Targets {}
