//! Thin flash-programming recipe: a client of L5, not part of the debug engine.
//!
//! Walks the RP2040 boot ROM's function lookup table and invokes its flash routines
//! through [`Session::call_function`], the same "write arguments, set PC, run, wait
//! for breakpoint" choreography a CMSIS-PACK flash algorithm would use.

use crate::consts::BOOTROM_TABLE_POINTER_ADDR;
use crate::debug::Trampoline;
use crate::error::SwdError;
use crate::line::{Delay, Line};
use crate::link::Session;

/// Two-ASCII-character boot ROM function tags, packed little-endian the way the
/// RP2040 boot ROM's lookup table stores them (`tag = c0 | (c1 << 8)`).
const fn rom_tag(c0: u8, c1: u8) -> u16 {
    (c0 as u16) | ((c1 as u16) << 8)
}

const TAG_CONNECT_INTERNAL_FLASH: u16 = rom_tag(b'I', b'F');
const TAG_FLASH_EXIT_XIP: u16 = rom_tag(b'E', b'X');
const TAG_FLASH_RANGE_ERASE: u16 = rom_tag(b'R', b'E');
const TAG_FLASH_RANGE_PROGRAM: u16 = rom_tag(b'R', b'P');
const TAG_FLASH_FLUSH_CACHE: u16 = rom_tag(b'F', b'C');
const TAG_FLASH_ENTER_CMD_XIP: u16 = rom_tag(b'C', b'X');

const FLASH_PAGE_SIZE: u32 = 256;
const FLASH_SECTOR_SIZE: u32 = 4096;
const FLASH_BLOCK_SIZE: u32 = 65536;
const FLASH_BLOCK_ERASE_CMD: u32 = 0xD8;

/// Resolved boot ROM entry points this recipe needs.
#[derive(Debug, Clone, Copy)]
pub struct BootromFunctions {
    pub connect_internal_flash: u32,
    pub flash_exit_xip: u32,
    pub flash_range_erase: u32,
    pub flash_range_program: u32,
    pub flash_flush_cache: u32,
    pub flash_enter_cmd_xip: u32,
}

/// Where the engine stages data and code while running the flash recipe.
#[derive(Debug, Clone, Copy)]
pub struct FlashWorkspace {
    /// RAM address the flash page currently being written is staged to.
    pub page_buffer: u32,
    /// RAM address of the injected trampoline stub, when not using the boot ROM's own.
    pub trampoline: Trampoline,
    /// Stack top (MSP) the called routine runs on; must not overlap `page_buffer` or an
    /// injected trampoline.
    pub stack_top: u32,
    pub reg_timeout_us: u32,
    pub run_timeout_us: u32,
}

impl<L: Line, D: Delay> Session<L, D> {
    /// Reads one (tag, pointer) entry from the boot ROM function table.
    fn read_table_entry(&mut self, entry_addr: u32) -> Result<(u16, u16), SwdError> {
        let tag = self.read_half_word_via_ap(entry_addr)?;
        let ptr = self.read_half_word_via_ap(entry_addr + 2)?;
        Ok((tag, ptr))
    }

    fn resolve_bootrom_function(&mut self, tag: u16) -> Result<u32, SwdError> {
        let table_ptr = self.read_half_word_via_ap(BOOTROM_TABLE_POINTER_ADDR)? as u32;

        let mut entry_addr = table_ptr;
        loop {
            let (entry_tag, entry_ptr) = self.read_table_entry(entry_addr)?;
            if entry_tag == tag {
                return Ok(entry_ptr as u32);
            }
            if entry_tag == 0 {
                return Err(SwdError::MissingBootromFunction(tag_name(tag)));
            }
            entry_addr += 4;
        }
    }

    /// Resolve all six boot ROM functions the flash recipe needs.
    pub fn resolve_flash_functions(&mut self) -> Result<BootromFunctions, SwdError> {
        Ok(BootromFunctions {
            connect_internal_flash: self.resolve_bootrom_function(TAG_CONNECT_INTERNAL_FLASH)?,
            flash_exit_xip: self.resolve_bootrom_function(TAG_FLASH_EXIT_XIP)?,
            flash_range_erase: self.resolve_bootrom_function(TAG_FLASH_RANGE_ERASE)?,
            flash_range_program: self.resolve_bootrom_function(TAG_FLASH_RANGE_PROGRAM)?,
            flash_flush_cache: self.resolve_bootrom_function(TAG_FLASH_FLUSH_CACHE)?,
            flash_enter_cmd_xip: self.resolve_bootrom_function(TAG_FLASH_ENTER_CMD_XIP)?,
        })
    }

    fn call_named(
        &mut self,
        name: &'static str,
        entry: u32,
        args: [u32; 4],
        workspace: &FlashWorkspace,
    ) -> Result<u32, SwdError> {
        self.call_function(
            entry,
            workspace.trampoline,
            args,
            workspace.stack_top,
            workspace.reg_timeout_us,
            workspace.run_timeout_us,
        )
        .map_err(|e| SwdError::RoutineCallFailed(name, Box::new(e)))
    }

    /// Write the whole (zero-padded to the next 4096-byte boundary) image into flash
    /// starting at offset 0, via the boot ROM routines.
    pub fn flash_image(
        &mut self,
        functions: &BootromFunctions,
        workspace: &FlashWorkspace,
        image: &[u8],
    ) -> Result<(), SwdError> {
        let padded_len = (image.len() as u32).div_ceil(FLASH_SECTOR_SIZE) * FLASH_SECTOR_SIZE;

        self.call_named(
            "connect_internal_flash",
            functions.connect_internal_flash,
            [0, 0, 0, 0],
            workspace,
        )?;
        self.call_named("flash_exit_xip", functions.flash_exit_xip, [0, 0, 0, 0], workspace)?;
        self.call_named(
            "flash_range_erase",
            functions.flash_range_erase,
            [0, padded_len, FLASH_BLOCK_SIZE, FLASH_BLOCK_ERASE_CMD],
            workspace,
        )?;

        let mut offset = 0u32;
        while offset < padded_len {
            let mut page = [0u8; FLASH_PAGE_SIZE as usize];
            let remaining = image.len().saturating_sub(offset as usize);
            let copy_len = remaining.min(FLASH_PAGE_SIZE as usize);
            if copy_len > 0 {
                page[..copy_len].copy_from_slice(&image[offset as usize..offset as usize + copy_len]);
            }

            let words: PageWords = page_to_words(&page);
            self.write_multi_word_via_ap(workspace.page_buffer, &words)?;

            self.call_named(
                "flash_range_program",
                functions.flash_range_program,
                [offset, workspace.page_buffer, FLASH_PAGE_SIZE, 0],
                workspace,
            )?;

            offset += FLASH_PAGE_SIZE;
        }

        self.call_named("flash_flush_cache", functions.flash_flush_cache, [0, 0, 0, 0], workspace)?;
        self.call_named(
            "flash_enter_cmd_xip",
            functions.flash_enter_cmd_xip,
            [0, 0, 0, 0],
            workspace,
        )?;

        Ok(())
    }
}

type PageWords = [u32; (FLASH_PAGE_SIZE / 4) as usize];

fn page_to_words(page: &[u8; FLASH_PAGE_SIZE as usize]) -> PageWords {
    let mut words = [0u32; (FLASH_PAGE_SIZE / 4) as usize];
    for (i, w) in words.iter_mut().enumerate() {
        let b = &page[i * 4..i * 4 + 4];
        *w = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    words
}

fn tag_name(tag: u16) -> &'static str {
    match tag {
        TAG_CONNECT_INTERNAL_FLASH => "connect_internal_flash",
        TAG_FLASH_EXIT_XIP => "flash_exit_xip",
        TAG_FLASH_RANGE_ERASE => "flash_range_erase",
        TAG_FLASH_RANGE_PROGRAM => "flash_range_program",
        TAG_FLASH_FLUSH_CACHE => "flash_flush_cache",
        TAG_FLASH_ENTER_CMD_XIP => "flash_enter_cmd_xip",
        _ => "unknown",
    }
}
