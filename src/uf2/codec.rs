use std::borrow::Cow;
use std::iter::FusedIterator;

use log::{debug, warn};

use crate::uf2::block::peek_index;
use crate::uf2::{BLOCK_LEN, DATA_LEN, FormatError, Info, Uf2Block};


#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawImage
{
	pub addr: u32,
	pub data: Vec<u8>,
}

impl RawImage
{
	pub fn new(addr: u32, data: Vec<u8>) -> Self
	{
		Self{addr, data}
	}
	
	pub fn len(&self) -> usize
	{
		self.data.len()
	}
	
	pub fn is_empty(&self) -> bool
	{
		self.data.is_empty()
	}
	
	pub fn to_container(&self, board_tag: Option<u32>) -> Result<ContainerImage, FormatError>
	{
		raw_to_container(&self.data, self.addr, board_tag)
	}
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContainerImage
{
	data: Vec<u8>,
}

impl ContainerImage
{
	pub fn from_bytes(data: Vec<u8>) -> Result<Self, FormatError>
	{
		if data.len() % BLOCK_LEN != 0
		{
			return Err(FormatError::Length{len: data.len()});
		}
		Ok(Self{data})
	}
	
	pub fn len(&self) -> usize
	{
		self.data.len() / BLOCK_LEN
	}
	
	pub fn is_empty(&self) -> bool
	{
		self.data.is_empty()
	}
	
	pub fn as_bytes(&self) -> &[u8]
	{
		&self.data
	}
	
	pub fn into_bytes(self) -> Vec<u8>
	{
		self.data
	}
	
	pub fn blocks(&self) -> Blocks<'_>
	{
		Blocks{chunks: self.data.chunks_exact(BLOCK_LEN), pos: 0}
	}
	
	pub fn board_tag(&self) -> Result<Option<u32>, FormatError>
	{
		for block in self.blocks()
		{
			let block = block?;
			if !block.no_flash {return Ok(block.info.board_tag());}
		}
		Ok(None)
	}
	
	// decodes every block, counting those that are not marked no-flash
	pub fn flashable(&self) -> Result<usize, FormatError>
	{
		let mut count = 0;
		for block in self.blocks()
		{
			if !block?.no_flash {count += 1;}
		}
		Ok(count)
	}
	
	// blocks sorted by their sequence index, stored order is kept for equal indices
	pub fn write_order(&self) -> Cow<'_, [u8]>
	{
		let chunks: Vec<&[u8]> = self.data.chunks_exact(BLOCK_LEN).collect();
		if chunks.windows(2).all(|w| peek_index(w[0]) <= peek_index(w[1]))
		{
			return Cow::Borrowed(self.data.as_slice());
		}
		let mut sorted = chunks;
		sorted.sort_by_key(|c| peek_index(c));
		Cow::Owned(sorted.concat())
	}
}

#[derive(Clone, Debug)]
pub struct Blocks<'l>
{
	chunks: std::slice::ChunksExact<'l, u8>,
	pos: usize,
}

impl<'l> Iterator for Blocks<'l>
{
	type Item = Result<Uf2Block<'l>, FormatError>;
	
	fn next(&mut self) -> Option<Self::Item>
	{
		let chunk = self.chunks.next()?;
		let pos = self.pos;
		self.pos += 1;
		Some(Uf2Block::read(chunk).map_err(|e| e.at(pos)))
	}
	
	fn size_hint(&self) -> (usize, Option<usize>)
	{
		self.chunks.size_hint()
	}
}

impl<'l> ExactSizeIterator for Blocks<'l> {}

impl<'l> FusedIterator for Blocks<'l> {}

pub fn raw_to_container(src: &[u8], addr: u32, board_tag: Option<u32>) -> Result<ContainerImage, FormatError>
{
	let chunks = (src.len() + (DATA_LEN - 1)) / DATA_LEN;
	if src.len() as u64 > (u32::MAX - addr) as u64 + 1
	{
		let block = ((u32::MAX - addr) as usize / DATA_LEN).min(chunks.saturating_sub(1));
		return Err(FormatError::AddressOverflow{block, addr, len: src.len()});
	}
	let count = u32::try_from(chunks).map_err(|_| FormatError::AddressOverflow{block: 0, addr, len: src.len()})?;
	let info = Info::from(board_tag);
	let mut dst = vec![0u8; chunks * BLOCK_LEN];
	for (i, (s, d)) in src.chunks(DATA_LEN).zip(dst.chunks_exact_mut(BLOCK_LEN)).enumerate()
	{
		// the length check above guarantees neither of these overflow
		let offset = (i * DATA_LEN) as u32;
		Uf2Block::new(false, addr + offset, i as u32, count, info, s)?.write(d)?;
	}
	debug!("encoded {} bytes at {addr:#X} into {chunks} blocks", src.len());
	Ok(ContainerImage{data: dst})
}

pub fn container_to_raw(image: &ContainerImage, max_padding: u64) -> Result<RawImage, FormatError>
{
	let mut dst = Vec::new();
	let mut start_addr: Option<u32> = None;
	let mut curr_addr = 0u64;
	let mut skipped = 0usize;
	for (pos, block) in image.blocks().enumerate()
	{
		let block = block?;
		if block.no_flash
		{
			skipped += 1;
			continue;
		}
		if block.index >= block.count
		{
			warn!("block {pos} has index {} but the image claims {} blocks", block.index, block.count);
		}
		if start_addr.is_none()
		{
			start_addr = Some(block.addr);
			curr_addr = block.addr as u64;
		}
		let addr = block.addr as u64;
		if addr < curr_addr
		{
			return Err(FormatError::OutOfOrder{block: pos, expect: curr_addr, addr: block.addr});
		}
		let padding = addr - curr_addr;
		if padding > max_padding
		{
			return Err(FormatError::ExcessivePadding{block: pos, padding, limit: max_padding});
		}
		if padding % 4 != 0
		{
			return Err(FormatError::Misaligned{block: pos, padding});
		}
		dst.resize(dst.len() + padding as usize, 0u8);
		dst.extend_from_slice(block.data);
		curr_addr = block.end_addr();
	}
	if skipped > 0 {debug!("skipped {skipped} no-flash blocks");}
	Ok(RawImage{addr: start_addr.unwrap_or(0), data: dst})
}
