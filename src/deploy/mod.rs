use core::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::config::Config;
use crate::device::{FlashTarget, Locator};
use crate::uf2::{container_to_raw, decode_block, raw_to_container, ContainerImage, FormatError, RawImage, BLOCK_LEN};

#[cfg(test)]
mod test;

#[derive(Debug, Error)]
pub enum IoError
{
	#[error("could not read {}", path.display())]
	ReadFailed{path: PathBuf, #[source] source: io::Error},
	#[error("could not write {}", path.display())]
	WriteFailed{path: PathBuf, #[source] source: io::Error},
}

#[derive(Debug, Error)]
pub enum Error
{
	#[error("conversion failed")]
	Format(#[from] FormatError),
	#[error(transparent)]
	Io(#[from] IoError),
	#[error("no drive to deploy")]
	NoTarget,
	#[error("nothing to flash (image has no flashable blocks)")]
	EmptyImage,
	#[error("{} is not a uf2 drive (no {} with a Board-ID)", .0.display(), crate::device::INFO_FILE)]
	NotATarget(PathBuf),
	#[error("{}", .0)]
	Deploy(DeployReport),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageKind
{
	Raw,
	Container,
}

impl ImageKind
{
	pub fn extension(&self) -> &'static str
	{
		match self
		{
			ImageKind::Raw => "bin",
			ImageKind::Container => "uf2",
		}
	}
	
	pub fn default_output(&self) -> PathBuf
	{
		PathBuf::from(format!("flash.{}", self.extension()))
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Conversion
{
	ToRaw{raw: RawImage, board_tag: Option<u32>},
	ToContainer{image: ContainerImage, addr: u32},
}

impl Conversion
{
	pub fn kind(&self) -> ImageKind
	{
		match self
		{
			Conversion::ToRaw{..} => ImageKind::Raw,
			Conversion::ToContainer{..} => ImageKind::Container,
		}
	}
	
	pub fn addr(&self) -> u32
	{
		match self
		{
			Conversion::ToRaw{raw, ..} => raw.addr,
			Conversion::ToContainer{addr, ..} => *addr,
		}
	}
	
	pub fn bytes(&self) -> &[u8]
	{
		match self
		{
			Conversion::ToRaw{raw, ..} => &raw.data,
			Conversion::ToContainer{image, ..} => image.as_bytes(),
		}
	}
}

pub fn is_container(src: &[u8]) -> bool
{
	src.len() >= BLOCK_LEN && decode_block(&src[..BLOCK_LEN]).is_ok()
}

pub fn convert(src: &[u8], config: &Config) -> Result<Conversion, FormatError>
{
	if is_container(src)
	{
		let image = ContainerImage::from_bytes(src.to_vec())?;
		let raw = container_to_raw(&image, config.max_padding)?;
		let board_tag = image.board_tag()?;
		Ok(Conversion::ToRaw{raw, board_tag})
	}
	else
	{
		let image = raw_to_container(src, config.base_address, config.board_tag)?;
		Ok(Conversion::ToContainer{image, addr: config.base_address})
	}
}

#[derive(Debug, Default)]
pub struct DeployReport
{
	pub flashed: Vec<FlashTarget>,
	pub failed: Vec<(FlashTarget, IoError)>,
}

impl DeployReport
{
	pub fn is_success(&self) -> bool
	{
		self.failed.is_empty()
	}
	
	pub fn attempted(&self) -> usize
	{
		self.flashed.len() + self.failed.len()
	}
}

impl fmt::Display for DeployReport
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		write!(f, "flashing failed on {} of {} drives", self.failed.len(), self.attempted())?;
		for (target, err) in &self.failed
		{
			write!(f, "\n\t{} ({}): {err}", target.root().display(), target.board_id())?;
			if let Some(src) = std::error::Error::source(err) {write!(f, ": {src}")?;}
		}
		Ok(())
	}
}

#[derive(Clone, Debug, Default)]
pub struct Request
{
	pub output: Option<PathBuf>,
	pub target: Option<PathBuf>,
	pub convert_only: bool,
}

#[derive(Debug)]
pub enum Outcome
{
	Converted{kind: ImageKind, path: PathBuf, len: usize},
	Deployed(DeployReport),
}

pub fn read_input(path: &Path) -> Result<Vec<u8>, IoError>
{
	fs::read(path).map_err(|source| IoError::ReadFailed{path: path.to_path_buf(), source})
}

pub fn write_file(path: &Path, data: &[u8]) -> Result<(), IoError>
{
	let fail = |source: io::Error| IoError::WriteFailed{path: path.to_path_buf(), source};
	let mut file = File::create(path).map_err(fail)?;
	file.write_all(data).map_err(fail)?;
	// mass storage bootloaders start flashing as soon as the data lands
	file.sync_all().map_err(fail)?;
	info!("wrote {} bytes to {}", data.len(), path.display());
	Ok(())
}

pub fn deploy(image: &ContainerImage, target: &FlashTarget) -> Result<PathBuf, IoError>
{
	let path = target.deploy_path();
	write_file(&path, &image.write_order())?;
	Ok(path)
}

// container input is deployed as given, only raw input gets encoded
fn flash_image(src: &[u8], config: &Config) -> Result<ContainerImage, Error>
{
	let image = if is_container(src)
	{
		let image = ContainerImage::from_bytes(src.to_vec())?;
		let flashable = image.flashable()?;
		info!("flashing uf2 image with {flashable} of {} blocks flashable", image.len());
		if flashable == 0 {return Err(Error::EmptyImage);}
		image
	}
	else
	{
		let image = raw_to_container(src, config.base_address, config.board_tag)?;
		info!("flashing {} bytes at {:#x} in {} blocks", src.len(), config.base_address, image.len());
		if image.is_empty() {return Err(Error::EmptyImage);}
		image
	};
	Ok(image)
}

pub fn convert_or_flash(src: &[u8], config: &Config, request: &Request, locator: &Locator) -> Result<Outcome, Error>
{
	let kind = if is_container(src) {ImageKind::Raw} else {ImageKind::Container};
	let output = match &request.output
	{
		Some(path) => Some(path.clone()),
		None if request.convert_only => Some(kind.default_output()),
		None => None,
	};
	if let Some(path) = output
	{
		let conversion = convert(src, config)?;
		info!("converting to {}, output size: {}, start address: {:#x}", kind.extension(), conversion.bytes().len(), conversion.addr());
		if conversion.bytes().is_empty() {warn!("input produced an empty image");}
		write_file(&path, conversion.bytes())?;
		return Ok(Outcome::Converted{kind, path, len: conversion.bytes().len()});
	}
	
	let image = flash_image(src, config)?;
	let targets: Vec<FlashTarget> = match &request.target
	{
		Some(root) => vec![FlashTarget::probe(root).ok_or_else(|| Error::NotATarget(root.clone()))?],
		None => locator.list_targets().collect(),
	};
	if targets.is_empty()
	{
		return Err(Error::NoTarget);
	}
	let mut report = DeployReport::default();
	for target in targets
	{
		info!("flashing {} ({})", target.root().display(), target.board_id());
		match deploy(&image, &target)
		{
			Ok(..) => report.flashed.push(target),
			Err(e) =>
			{
				warn!("flashing {} failed: {e}", target.root().display());
				report.failed.push((target, e));
			},
		}
	}
	if report.is_success() {Ok(Outcome::Deployed(report))}
	else {Err(Error::Deploy(report))}
}
