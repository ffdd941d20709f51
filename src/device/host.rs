use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

pub trait MountRoots
{
	fn name(&self) -> &str;
	
	fn candidates(&self) -> Vec<PathBuf>;
}

// every subdirectory of the given directories is a candidate mount root
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanDirs
{
	dirs: Vec<PathBuf>,
}

impl ScanDirs
{
	pub fn new(dirs: Vec<PathBuf>) -> Self
	{
		Self{dirs}
	}
	
	pub fn linux(user: Option<&str>) -> Self
	{
		let media = Path::new("/media");
		let mut dirs = Vec::new();
		match user.map(|u| media.join(u)).filter(|p| p.is_dir())
		{
			Some(user_media) => dirs.push(user_media),
			None => dirs.push(media.to_path_buf()),
		}
		if let Some(user) = user
		{
			let run_media = Path::new("/run/media").join(user);
			if run_media.is_dir() {dirs.push(run_media);}
		}
		Self{dirs}
	}
	
	pub fn macos() -> Self
	{
		Self{dirs: vec![PathBuf::from("/Volumes")]}
	}
	
	pub fn dirs(&self) -> &[PathBuf]
	{
		&self.dirs
	}
}

impl MountRoots for ScanDirs
{
	fn name(&self) -> &str
	{
		"directory scan"
	}
	
	fn candidates(&self) -> Vec<PathBuf>
	{
		let mut found = Vec::new();
		for dir in &self.dirs
		{
			let entries = match fs::read_dir(dir)
			{
				Ok(entries) => entries,
				Err(e) =>
				{
					debug!("cannot scan {}: {e}", dir.display());
					continue;
				},
			};
			found.extend(entries.filter_map(Result::ok).map(|e| e.path()).filter(|p| p.is_dir()));
		}
		found
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DriveLetters;

impl MountRoots for DriveLetters
{
	fn name(&self) -> &str
	{
		"drive letters"
	}
	
	fn candidates(&self) -> Vec<PathBuf>
	{
		(b'A'..=b'Z').map(|l| PathBuf::from(format!("{}:\\", l as char))).filter(|p| p.is_dir()).collect()
	}
}

pub fn host_roots() -> Box<dyn MountRoots>
{
	if cfg!(windows) {Box::new(DriveLetters)}
	else if cfg!(target_os = "macos") {Box::new(ScanDirs::macos())}
	else
	{
		let user = env::var("USER").ok();
		Box::new(ScanDirs::linux(user.as_deref()))
	}
}
